//! Planner that replays a fixed list of tool calls
//!
//! Used for `analyst replay` and for driving the orchestrator without a
//! model. The script is a JSON array of `{"tool": ..., "arguments": {...}}`
//! envelopes, consumed in order across turns.

use analyst_application::{PlannerError, PlannerPort, PlannerView};
use analyst_domain::ToolCall;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct ScriptedPlanner {
    calls: Vec<ToolCall>,
    cursor: Mutex<usize>,
}

impl ScriptedPlanner {
    pub fn new(calls: Vec<ToolCall>) -> Self {
        Self {
            calls,
            cursor: Mutex::new(0),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let calls: Vec<ToolCall> = serde_json::from_str(json)?;
        Ok(Self::new(calls))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Calls not yet handed out
    pub fn remaining(&self) -> usize {
        let cursor = *self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        self.calls.len().saturating_sub(cursor)
    }
}

#[async_trait]
impl PlannerPort for ScriptedPlanner {
    async fn next_action(&self, view: &PlannerView<'_>) -> Result<ToolCall, PlannerError> {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let call = self
            .calls
            .get(*cursor)
            .cloned()
            .ok_or(PlannerError::Exhausted)?;
        *cursor += 1;
        debug!(
            "Scripted call {} of {}: {} (history {})",
            *cursor,
            self.calls.len(),
            call.tool_name,
            view.history.len()
        );
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> PlannerView<'static> {
        PlannerView {
            user_message: "go",
            answers_clarification: None,
            tools: &[],
            history: &[],
            remaining_steps: 10,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let planner = ScriptedPlanner::from_json(
            r#"[
                {"tool": "parse_dataset", "arguments": {"dataset_id": "sales"}},
                {"tool": "final_answer", "arguments": {"answer": "done"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(planner.remaining(), 2);

        let first = planner.next_action(&view()).await.unwrap();
        assert_eq!(first.tool_name, "parse_dataset");
        let second = planner.next_action(&view()).await.unwrap();
        assert_eq!(second.get_string("answer"), Some("done"));

        assert_eq!(planner.remaining(), 0);
        assert_eq!(
            planner.next_action(&view()).await.unwrap_err(),
            PlannerError::Exhausted
        );
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(
            ScriptedPlanner::from_json(r#"{"tool": "x"}"#),
            Err(ScriptError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ScriptedPlanner::load("/nonexistent/script.json"),
            Err(ScriptError::Io { .. })
        ));
    }
}
