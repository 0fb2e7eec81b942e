//! Domain layer for analyst
//!
//! This crate contains the core types of the analysis agent: tool contracts,
//! argument validation, sandbox jobs and the per-turn state machine.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! The agent acts only through a fixed catalog of tools. Each tool declares
//! its argument schema, the session artifacts it depends on and the keys its
//! result carries. Every outcome comes back as a [`ToolResult`] envelope.
//!
//! ## Sandbox
//!
//! Generated analysis code runs as a one-shot [`SandboxJob`] and reports a
//! [`SandboxOutcome`]: exactly one published value, or a failure.
//!
//! ## Turns
//!
//! A [`Turn`] processes one user message and ends answered, paused for
//! clarification, or failed.

pub mod core;
pub mod dataset;
pub mod prompt;
pub mod sandbox;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use core::{error::DomainError, string::truncate};
pub use dataset::{ColumnSchema, ColumnType, DATASET_ID_PATTERN, DatasetId, DatasetSchema};
pub use prompt::{AnalysisPromptTemplate, RetryContext};
pub use sandbox::{LogBuffer, SandboxFailure, SandboxJob, SandboxLimits, SandboxOutcome};
pub use session::{
    AnalysisSession, ExecutionRecord, GeneratedCode, HistoryEntry, SessionContext, SessionState,
    Turn, TurnArtifacts, TurnFailure, TurnState,
};
pub use tool::{
    CatalogEntry, ErrorKind, FieldViolation, ParamType, Prerequisite, SchemaValidator,
    ToolArguments, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResponse, ToolResult,
    ToolResultMetadata, ToolStatus, ToolValidator, TurnEffect, ValidatedArguments,
    ValidationError,
};
