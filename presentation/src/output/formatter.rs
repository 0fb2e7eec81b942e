//! Output formatter trait

use analyst_domain::Turn;

/// Trait for formatting finished turns
pub trait OutputFormatter {
    /// The answer, the clarification question or the failure sentence
    fn format_turn(&self, turn: &Turn) -> String;

    /// Every dispatched call with its outcome, then the final state
    fn format_steps(&self, turn: &Turn) -> String;

    /// The whole turn as JSON
    fn format_json(&self, turn: &Turn) -> String;
}
