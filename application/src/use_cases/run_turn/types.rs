//! Type definitions for the RunTurn use case.

use analyst_domain::DomainError;
use thiserror::Error;

/// Misuse of the orchestrator. Tool and collaborator failures never
/// surface here; they end up in the turn's state.
#[derive(Error, Debug)]
pub enum RunTurnError {
    #[error("Turn {turn} is {state} and accepts no further tool calls")]
    TurnClosed { turn: usize, state: &'static str },

    #[error("Turn transition rejected: {0}")]
    Transition(#[from] DomainError),
}

impl RunTurnError {
    pub fn is_turn_closed(&self) -> bool {
        matches!(self, RunTurnError::TurnClosed { .. })
    }
}
