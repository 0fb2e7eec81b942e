//! Console output formatter for turns, catalogs and sandbox runs

use crate::output::formatter::OutputFormatter;
use crate::progress::reporter::result_summary;
use analyst_domain::{CatalogEntry, SandboxOutcome, ToolDefinition, Turn, TurnState};
use colored::Colorize;

/// Formats results for console display
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFormatter {
    /// Show failure diagnostics (error kind and internal message)
    pub verbose: bool,
}

impl ConsoleFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Tool catalog with argument lists
    pub fn format_catalog(definitions: &[ToolDefinition]) -> String {
        let mut output = Self::header("Tools");
        for definition in definitions {
            output.push_str(&format!(
                "\n{}\n  {}\n",
                definition.name.yellow().bold(),
                definition.description
            ));
            for param in &definition.parameters {
                if definition.system_arguments.contains(&param.name) {
                    continue;
                }
                let required = if param.required { "required" } else { "optional" };
                output.push_str(&format!(
                    "  - {} ({}, {}): {}\n",
                    param.name.cyan(),
                    param.param_type,
                    required,
                    param.description
                ));
            }
            if !definition.prerequisites.is_empty() {
                let needs: Vec<&str> =
                    definition.prerequisites.iter().map(|p| p.as_str()).collect();
                output.push_str(&format!("  needs: {}\n", needs.join(", ")));
            }
            output.push_str(&format!("  returns: {}\n", definition.result_description));
        }
        output
    }

    pub fn format_catalog_json(entries: &[CatalogEntry]) -> String {
        serde_json::to_string_pretty(entries)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    /// Outcome of a direct sandbox run
    pub fn format_outcome(outcome: &SandboxOutcome) -> String {
        let mut output = String::new();
        for line in &outcome.captured_logs {
            output.push_str(&format!("{} {}\n", "log".dimmed(), line));
        }
        match (&outcome.failure, &outcome.captured_result) {
            (None, Some(value)) => {
                let rendered =
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
                output.push_str(&format!("{}\n{}\n", "Result:".green().bold(), rendered));
            }
            (Some(failure), _) => {
                output.push_str(&format!("{} {}\n", "Failed:".red().bold(), failure));
            }
            (None, None) => {
                output.push_str(&format!("{} no result published\n", "Failed:".red().bold()));
            }
        }
        output
    }

    fn header(title: &str) -> String {
        format!("{}\n{}\n", title.bold(), "=".repeat(title.len()))
    }

    fn state_text(&self, state: &TurnState) -> String {
        match state {
            TurnState::InProgress => "Turn did not finish.".dimmed().to_string(),
            TurnState::Answered { answer } => answer.clone(),
            TurnState::PausedForClarification { question } => {
                format!("{} {}", "?".yellow().bold(), question)
            }
            TurnState::Failed { failure } => {
                let mut text = failure.user_message().red().to_string();
                if self.verbose {
                    let kind = failure
                        .error_kind()
                        .map(|k| format!("[{}] ", k))
                        .unwrap_or_default();
                    text.push_str(&format!("\n{}", format!("{}{}", kind, failure).dimmed()));
                }
                text
            }
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_turn(&self, turn: &Turn) -> String {
        self.state_text(&turn.state)
    }

    fn format_steps(&self, turn: &Turn) -> String {
        let mut output = Self::header(&format!("Turn {}", turn.number));
        output.push_str(&format!("{} {}\n\n", "Message:".cyan().bold(), turn.user_message));

        for entry in &turn.history {
            let mark = if entry.result.is_success() {
                "v".green()
            } else {
                "x".red()
            };
            output.push_str(&format!(
                "{:>3}. {} {} {}\n",
                entry.step,
                mark,
                entry.call.tool_name.bold(),
                result_summary(&entry.result)
            ));
            for line in &entry.result.logs {
                output.push_str(&format!("       {} {}\n", "log".dimmed(), line));
            }
        }

        output.push_str(&format!(
            "\n{} {}\n{}\n",
            "State:".cyan().bold(),
            turn.state.as_str(),
            self.state_text(&turn.state)
        ));
        output
    }

    fn format_json(&self, turn: &Turn) -> String {
        serde_json::to_string_pretty(turn).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_domain::{ToolCall, ToolError, ToolResult, TurnArtifacts, TurnFailure};
    use serde_json::{Map, json};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_answered_turn() {
        plain();
        let mut turn = Turn::new(1, "How many rows?");
        turn.answer("There are 3 rows.", TurnArtifacts::default()).unwrap();
        assert_eq!(ConsoleFormatter::default().format_turn(&turn), "There are 3 rows.");
    }

    #[test]
    fn test_failure_hides_kind_unless_verbose() {
        plain();
        let mut turn = Turn::new(1, "Total?");
        turn.fail(TurnFailure::RegenerationLimit {
            attempts: 4,
            error: ToolError::execution_failure("boom"),
        })
        .unwrap();

        let quiet = ConsoleFormatter::new(false).format_turn(&turn);
        assert!(quiet.contains("after 4 attempts"));
        assert!(!quiet.contains("EXECUTION_FAILURE"));

        let verbose = ConsoleFormatter::new(true).format_turn(&turn);
        assert!(verbose.contains("[EXECUTION_FAILURE]"));
    }

    #[test]
    fn test_steps_list_calls_in_order() {
        plain();
        let mut turn = Turn::new(2, "Total sales");
        turn.record(
            ToolCall::new("parse_dataset").with_arg("dataset_id", "sales"),
            ToolResult::success("parse_dataset", Map::new()),
        );
        turn.record(
            ToolCall::new("execute_analysis_code").with_arg("dataset_id", "sales"),
            ToolResult::failure("execute_analysis_code", ToolError::execution_no_result())
                .with_logs(vec!["rows: 3".into()]),
        );

        let output = ConsoleFormatter::default().format_steps(&turn);
        let parse = output.find("parse_dataset").unwrap();
        let execute = output.find("execute_analysis_code").unwrap();
        assert!(parse < execute);
        assert!(output.contains("EXECUTION_NO_RESULT"));
        assert!(output.contains("rows: 3"));
        assert!(output.contains("in_progress"));
    }

    #[test]
    fn test_format_outcome() {
        plain();
        let ok = SandboxOutcome::published(json!({"total": 42}), vec!["start".into()]);
        let text = ConsoleFormatter::format_outcome(&ok);
        assert!(text.contains("log start"));
        assert!(text.contains("\"total\": 42"));

        let timeout = SandboxOutcome::timeout(5000, vec![]);
        assert!(ConsoleFormatter::format_outcome(&timeout).contains("timed out after 5000ms"));
    }
}
