//! Turn state machine.
//!
//! A [`Turn`] starts `InProgress` and leaves it exactly once:
//!
//! ```text
//! InProgress ──> PausedForClarification
//!            ├─> Answered
//!            └─> Failed
//! ```
//!
//! Transitions out of a closed state are rejected with
//! [`DomainError::InvalidTransition`].

use super::entities::{ExecutionRecord, GeneratedCode};
use crate::core::error::DomainError;
use crate::tool::entities::ToolCall;
use crate::tool::value_objects::{ErrorKind, ToolError, ToolResult};
use serde::{Deserialize, Serialize};

/// Why a turn failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TurnFailure {
    /// A handler broke the result contract or crashed
    ToolDefect { tool: String, error: ToolError },
    /// The generation collaborator could not produce output
    GenerationUnavailable { tool: String, error: ToolError },
    /// Execution kept failing after the allowed regenerations
    RegenerationLimit { attempts: usize, error: ToolError },
    /// The planner issued more calls than the step budget allows
    StepBudgetExhausted { max_steps: usize },
    /// The planner itself failed
    PlannerFailed { message: String },
    /// The turn was cancelled from outside
    Cancelled,
}

impl TurnFailure {
    /// Tool error kind behind the failure, kept for diagnostics.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            TurnFailure::ToolDefect { error, .. }
            | TurnFailure::GenerationUnavailable { error, .. }
            | TurnFailure::RegenerationLimit { error, .. } => Some(error.kind),
            _ => None,
        }
    }

    /// Single sentence suitable for the end user. Never names error kinds.
    pub fn user_message(&self) -> String {
        match self {
            TurnFailure::ToolDefect { .. } => {
                "Something went wrong while analyzing your data. Please try again.".to_string()
            }
            TurnFailure::GenerationUnavailable { .. } => {
                "The analysis service is unavailable right now. Please try again later."
                    .to_string()
            }
            TurnFailure::RegenerationLimit { attempts, .. } => format!(
                "I could not produce working analysis code after {} attempts. Try rephrasing your request.",
                attempts
            ),
            TurnFailure::StepBudgetExhausted { .. } => {
                "This request needed too many steps to finish. Try asking something narrower."
                    .to_string()
            }
            TurnFailure::PlannerFailed { .. } => {
                "The assistant could not decide how to continue. Please try again.".to_string()
            }
            TurnFailure::Cancelled => "The request was cancelled.".to_string(),
        }
    }
}

impl std::fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnFailure::ToolDefect { tool, error } => write!(f, "defect in {}: {}", tool, error),
            TurnFailure::GenerationUnavailable { tool, error } => {
                write!(f, "generation failed in {}: {}", tool, error)
            }
            TurnFailure::RegenerationLimit { attempts, error } => {
                write!(f, "execution failed {} times, last: {}", attempts, error)
            }
            TurnFailure::StepBudgetExhausted { max_steps } => {
                write!(f, "step budget of {} exhausted", max_steps)
            }
            TurnFailure::PlannerFailed { message } => write!(f, "planner failed: {}", message),
            TurnFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TurnState {
    InProgress,
    PausedForClarification { question: String },
    Answered { answer: String },
    Failed { failure: TurnFailure },
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::InProgress => "in_progress",
            TurnState::PausedForClarification { .. } => "paused_for_clarification",
            TurnState::Answered { .. } => "answered",
            TurnState::Failed { .. } => "failed",
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, TurnState::InProgress)
    }

    pub fn clarification_question(&self) -> Option<&str> {
        match self {
            TurnState::PausedForClarification { question } => Some(question),
            _ => None,
        }
    }
}

/// One dispatched call and its envelope, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: usize,
    pub call: ToolCall,
    pub result: ToolResult,
}

/// Artifacts frozen when the turn is answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<GeneratedCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionRecord>,
}

/// One cycle of processing a single user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// 1-indexed position within the session
    pub number: usize,
    pub user_message: String,
    /// Question this message replies to, if the previous turn paused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers_clarification: Option<String>,
    pub state: TurnState,
    pub history: Vec<HistoryEntry>,
    /// Consecutive execution failures since the last success
    pub execution_failures: usize,
    #[serde(default)]
    pub artifacts: TurnArtifacts,
}

impl Turn {
    pub fn new(number: usize, user_message: impl Into<String>) -> Self {
        Self {
            number,
            user_message: user_message.into(),
            answers_clarification: None,
            state: TurnState::InProgress,
            history: Vec::new(),
            execution_failures: 0,
            artifacts: TurnArtifacts::default(),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.is_in_progress()
    }

    pub fn steps(&self) -> usize {
        self.history.len()
    }

    pub fn record(&mut self, call: ToolCall, result: ToolResult) -> &HistoryEntry {
        let step = self.history.len() + 1;
        self.history.push(HistoryEntry { step, call, result });
        &self.history[step - 1]
    }

    pub fn last_result(&self) -> Option<&ToolResult> {
        self.history.last().map(|entry| &entry.result)
    }

    fn transition(&mut self, next: TurnState) -> Result<(), DomainError> {
        if !self.state.is_in_progress() {
            return Err(DomainError::InvalidTransition {
                from: self.state.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn pause(&mut self, question: impl Into<String>) -> Result<(), DomainError> {
        self.transition(TurnState::PausedForClarification {
            question: question.into(),
        })
    }

    pub fn answer(
        &mut self,
        answer: impl Into<String>,
        artifacts: TurnArtifacts,
    ) -> Result<(), DomainError> {
        self.transition(TurnState::Answered {
            answer: answer.into(),
        })?;
        self.artifacts = artifacts;
        Ok(())
    }

    pub fn fail(&mut self, failure: TurnFailure) -> Result<(), DomainError> {
        self.transition(TurnState::Failed { failure })
    }

    pub fn failure(&self) -> Option<&TurnFailure> {
        match &self.state {
            TurnState::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_new_turn_in_progress() {
        let turn = Turn::new(1, "hello");
        assert!(turn.is_in_progress());
        assert_eq!(turn.steps(), 0);
        assert!(turn.failure().is_none());
    }

    #[test]
    fn test_pause_then_reject_further_transitions() {
        let mut turn = Turn::new(1, "m");
        turn.pause("Which column?").unwrap();
        assert_eq!(turn.state.clarification_question(), Some("Which column?"));

        let err = turn.answer("42", TurnArtifacts::default()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "paused_for_clarification".into(),
                to: "answered".into()
            }
        );
    }

    #[test]
    fn test_answered_is_terminal() {
        let mut turn = Turn::new(1, "m");
        turn.answer("42", TurnArtifacts::default()).unwrap();
        assert!(turn.fail(TurnFailure::Cancelled).is_err());
        assert_eq!(turn.state, TurnState::Answered { answer: "42".into() });
    }

    #[test]
    fn test_record_numbers_steps() {
        let mut turn = Turn::new(1, "m");
        turn.record(ToolCall::new("a"), ToolResult::success("a", Map::new()));
        let entry = turn.record(ToolCall::new("b"), ToolResult::success("b", Map::new()));
        assert_eq!(entry.step, 2);
        assert_eq!(turn.last_result().unwrap().tool_name, "b");
    }

    #[test]
    fn test_failure_user_message_hides_kind() {
        let failure = TurnFailure::ToolDefect {
            tool: "parse_dataset".into(),
            error: ToolError::invalid_tool_result("payload is not an object"),
        };
        assert_eq!(failure.error_kind(), Some(ErrorKind::InvalidToolResult));
        assert!(!failure.user_message().contains("INVALID_TOOL_RESULT"));
        assert!(failure.to_string().contains("INVALID_TOOL_RESULT"));
    }

    #[test]
    fn test_failure_wire_shape() {
        let state = TurnState::Failed {
            failure: TurnFailure::StepBudgetExhausted { max_steps: 4 },
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["failure"]["reason"], "step_budget_exhausted");
    }
}
