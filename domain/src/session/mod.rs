//! Analysis session domain.
//!
//! - [`entities::AnalysisSession`]: one user's conversation, owning its artifacts
//! - [`entities::SessionState`]: artifacts carried between tool calls and turns
//! - [`turn::Turn`]: one user message and the tool calls it triggered
//! - [`turn::TurnState`]: the per-turn state machine

pub mod entities;
pub mod turn;

pub use entities::{AnalysisSession, ExecutionRecord, GeneratedCode, SessionContext, SessionState};
pub use turn::{HistoryEntry, Turn, TurnArtifacts, TurnFailure, TurnState};
