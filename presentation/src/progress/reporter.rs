//! Progress reporting for turn execution

use analyst_application::TurnProgressNotifier;
use analyst_domain::{ToolResult, Turn, TurnState};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a spinner per tool call
pub struct ProgressReporter {
    current: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line outcome of a tool call, e.g. `ok (12ms)` or `EXECUTION_FAILURE: ...`
pub fn result_summary(result: &ToolResult) -> String {
    let duration = result
        .metadata
        .duration_ms
        .map(|ms| format!(" ({}ms)", ms))
        .unwrap_or_default();
    match result.error() {
        None => format!("ok{}", duration),
        Some(error) => format!("{}: {}{}", error.kind, error.message, duration),
    }
}

impl TurnProgressNotifier for ProgressReporter {
    fn on_turn_start(&self, turn_number: usize, _user_message: &str) {
        eprintln!("{} {}", "->".cyan(), format!("Turn {}", turn_number).bold());
    }

    fn on_tool_call(&self, tool_name: &str, arg_keys: &[&str]) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(tool_name.to_string());
        pb.set_message(format!("({})", arg_keys.join(", ")));
        pb.enable_steady_tick(Duration::from_millis(100));

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn on_tool_result(&self, tool_name: &str, result: &ToolResult) {
        let line = if result.is_success() {
            format!("  {} {} {}", "v".green(), tool_name, result_summary(result).dimmed())
        } else {
            format!("  {} {} {}", "x".red(), tool_name, result_summary(result).yellow())
        };

        match self.take_bar() {
            Some(pb) => {
                pb.finish_and_clear();
                eprintln!("{}", line);
            }
            None => eprintln!("{}", line),
        }
    }

    fn on_regeneration(&self, attempt: usize, max_regenerations: usize, error: &str) {
        eprintln!(
            "  {} execution failed ({}/{}), regenerating: {}",
            "!".yellow(),
            attempt,
            max_regenerations,
            error
        );
    }

    fn on_turn_state(&self, state: &TurnState) {
        if let Some(pb) = self.take_bar() {
            pb.finish_and_clear();
        }
        let label = match state {
            TurnState::InProgress => return,
            TurnState::PausedForClarification { .. } => "waiting for your reply".yellow(),
            TurnState::Answered { .. } => "answered".green(),
            TurnState::Failed { .. } => "failed".red(),
        };
        eprintln!("{} {}", "->".cyan(), label);
    }
}

/// Plain text progress without spinners
pub struct SimpleProgress;

impl TurnProgressNotifier for SimpleProgress {
    fn on_tool_call(&self, tool_name: &str, _arg_keys: &[&str]) {
        eprintln!("{} {}", "->".cyan(), tool_name);
    }

    fn on_tool_result(&self, tool_name: &str, result: &ToolResult) {
        let mark = if result.is_success() { "v".green() } else { "x".red() };
        eprintln!("  {} {} {}", mark, tool_name, result_summary(result));
    }

    fn on_turn_complete(&self, turn: &Turn) {
        eprintln!("  {} steps, {}", turn.steps(), turn.state.as_str());
    }
}
