//! Planner port
//!
//! The planner is the model-driven step that chooses the next tool call.
//! It sees the user message, the catalog and what has happened so far in
//! the turn, and answers with exactly one [`ToolCall`].

use super::collaborator::CollaboratorError;
use analyst_domain::{HistoryEntry, ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from the planner
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("Planner has no further actions")]
    Exhausted,

    #[error("Planner returned no tool call: {0}")]
    NoToolCall(String),

    #[error("Planner request failed: {0}")]
    RequestFailed(String),

    #[error("Planner unavailable: {0}")]
    Unavailable(String),

    #[error("Planner timed out after {0:?}")]
    Timeout(Duration),
}

impl CollaboratorError for PlannerError {
    fn is_transient(&self) -> bool {
        matches!(self, PlannerError::Unavailable(_) | PlannerError::Timeout(_))
    }

    fn timed_out(after: Duration) -> Self {
        PlannerError::Timeout(after)
    }
}

/// What the planner sees when choosing the next call.
#[derive(Debug, Clone, Copy)]
pub struct PlannerView<'a> {
    pub user_message: &'a str,
    /// Question the user message replies to
    pub answers_clarification: Option<&'a str>,
    /// Tool definitions sorted by name
    pub tools: &'a [ToolDefinition],
    pub history: &'a [HistoryEntry],
    /// Calls still allowed in this turn
    pub remaining_steps: usize,
}

#[async_trait]
pub trait PlannerPort: Send + Sync {
    async fn next_action(&self, view: &PlannerView<'_>) -> Result<ToolCall, PlannerError>;
}
