//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.
//! Collaborators are injected at session setup as trait objects; tool
//! handlers reach them only through these traits.

pub mod collaborator;
pub mod conversation_logger;
pub mod datasets;
pub mod generation;
pub mod planner;
pub mod sandbox;
pub mod tool_schema;
pub mod turn_progress;
