//! Turn progress port.
//!
//! [`TurnProgressNotifier`] is an **output port** that the presentation layer
//! implements to display turn progress to the user. All callback argument
//! types come from the domain layer.
//!
//! All methods have default no-op implementations, so implementers only
//! need to override the callbacks they care about.

use analyst_domain::{ToolResult, Turn, TurnState};

pub trait TurnProgressNotifier: Send + Sync {
    /// Called when a turn starts processing a user message
    fn on_turn_start(&self, _turn_number: usize, _user_message: &str) {}

    /// Called before a tool call is dispatched
    fn on_tool_call(&self, _tool_name: &str, _arg_keys: &[&str]) {}

    /// Called when a tool call returns its envelope
    fn on_tool_result(&self, _tool_name: &str, _result: &ToolResult) {}

    /// Called when an execution failure will be fed back for regeneration
    fn on_regeneration(&self, _attempt: usize, _max_regenerations: usize, _error: &str) {}

    /// Called when the turn leaves `InProgress`
    fn on_turn_state(&self, _state: &TurnState) {}

    /// Called once the turn is archived in the session
    fn on_turn_complete(&self, _turn: &Turn) {}
}

/// No-op implementation
pub struct NoTurnProgress;

impl TurnProgressNotifier for NoTurnProgress {}
