//! Tool domain module
//!
//! This module defines the contract every tool in the analysis agent obeys:
//! a statically declared [`ToolDefinition`] (argument schema, result shape,
//! session prerequisites), an untrusted [`ToolCall`] from the planning
//! model, and the uniform [`ToolResult`] envelope that comes back.
//!
//! ```text
//! ┌────────────────┐   validate   ┌────────────────────┐   invoke   ┌────────────┐
//! │ ToolCall       │─────────────▶│ ValidatedArguments │───────────▶│ ToolResult │
//! │ (llm, untrusted)│             │ + system arguments │            │ (envelope) │
//! └────────────────┘              └────────────────────┘            └────────────┘
//! ```
//!
//! # Error taxonomy
//!
//! Every failure is a [`ToolError`] tagged with an [`ErrorKind`]:
//!
//! | Kind | Handling |
//! |------|----------|
//! | `INVALID_ARGUMENT`, `PREREQUISITE_MISSING` | local, the model may retry |
//! | `GENERATION_FAILED` | fails the turn |
//! | `EXECUTION_*` | fed back for regeneration, bounded |
//! | `INVALID_TOOL_RESULT`, `TOOL_EXECUTION_ERROR` | defect, fails the turn |
//!
//! # Architecture
//!
//! - **Domain** (this module): definitions and pure validation, no I/O
//! - **Application**: `ToolHandler` port, registry and contract pipeline
//! - **Infrastructure**: JSON Schema export for tool-calling APIs

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{
    ParamType, Prerequisite, ToolArguments, ToolCall, ToolDefinition, ToolParameter, TurnEffect,
};
pub use traits::{
    FieldViolation, SchemaValidator, ToolValidator, ValidatedArguments, ValidationError,
};
pub use value_objects::{
    CatalogEntry, ErrorKind, ToolError, ToolResponse, ToolResult, ToolResultMetadata, ToolStatus,
};
