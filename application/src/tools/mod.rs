//! Tool system of the analysis agent.
//!
//! ```text
//! ToolRegistry ──▶ ToolContract::validate ──▶ ToolContract::invoke ──▶ ToolHandler
//!  (static)          (schema check)            (merge, dispatch,         (one per tool)
//!                                               normalize)
//! ```
//!
//! The catalog is assembled once by [`catalog::standard_registry`] from
//! explicit `(definition, handler)` pairs and never mutated afterwards.

pub mod catalog;
pub mod contract;
pub mod conversation;
pub mod dataset;
pub mod execution;
pub mod generation;
pub mod handler;
pub mod registry;

pub use catalog::{StandardCollaborators, standard_registry};
pub use contract::ToolContract;
pub use handler::{HandlerError, HandlerOutput, ToolHandler};
pub use registry::{ToolRegistry, ToolRegistryBuilder};

/// Tool names, declared once.
pub mod names {
    pub const GET_DATASET_SCHEMA: &str = "get_dataset_schema";
    pub const PARSE_DATASET: &str = "parse_dataset";
    pub const GENERATE_ANALYSIS_CODE: &str = "generate_analysis_code";
    pub const EXECUTE_ANALYSIS_CODE: &str = "execute_analysis_code";
    pub const GENERATE_REPORT: &str = "generate_report";
    pub const ASK_FOR_CLARIFICATION: &str = "ask_for_clarification";
    pub const FINAL_ANSWER: &str = "final_answer";
}

/// Argument keys shared between definitions, handlers and the orchestrator.
pub mod keys {
    pub const DATASET_ID: &str = "dataset_id";
    pub const GOAL: &str = "goal";
    pub const PREVIOUS_ERROR: &str = "previous_error";
    pub const CODE: &str = "code";
    pub const FOCUS: &str = "focus";
    pub const QUESTION: &str = "question";
    pub const ANSWER: &str = "answer";

    // System-only arguments
    pub const PREVIOUS_ATTEMPT: &str = "previous_attempt";
    pub const ANALYSIS_RESULT: &str = "analysis_result";
}
