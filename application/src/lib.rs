//! Application layer for analyst
//!
//! This crate contains the tool catalog and contract, the turn orchestrator,
//! port definitions and execution parameters. It depends only on the domain
//! layer.

pub mod config;
pub mod ports;
pub mod tools;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{CollaboratorPolicy, ExecutionParams};
pub use ports::{
    collaborator::CollaboratorError,
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    datasets::{DatasetContentPort, DatasetError, DatasetSchemaPort},
    generation::{
        CodeGenerationPort, CodeRequest, GenerationError, PreviousAttempt, ReportGenerationPort,
        ReportRequest,
    },
    planner::{PlannerError, PlannerPort, PlannerView},
    sandbox::{SandboxError, SandboxPort},
    tool_schema::ToolSchemaPort,
    turn_progress::{NoTurnProgress, TurnProgressNotifier},
};
pub use tools::{
    HandlerError, HandlerOutput, StandardCollaborators, ToolContract, ToolHandler, ToolRegistry,
    ToolRegistryBuilder, keys, names, standard_registry,
};
pub use use_cases::run_turn::{RunTurnError, TurnOrchestrator};
