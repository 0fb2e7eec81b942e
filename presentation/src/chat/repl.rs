//! REPL (Read-Eval-Print Loop) for interactive analysis sessions

use crate::cli::commands::OutputFormat;
use crate::output::console::ConsoleFormatter;
use crate::output::formatter::OutputFormatter;
use analyst_application::{PlannerPort, RunTurnError, TurnOrchestrator};
use analyst_domain::{AnalysisSession, Turn};
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Interactive chat over one analysis session
pub struct ChatRepl {
    orchestrator: TurnOrchestrator,
    planner: Arc<dyn PlannerPort>,
    session: AnalysisSession,
    formatter: ConsoleFormatter,
    output: OutputFormat,
}

impl ChatRepl {
    pub fn new(
        orchestrator: TurnOrchestrator,
        planner: Arc<dyn PlannerPort>,
        session: AnalysisSession,
    ) -> Self {
        Self {
            orchestrator,
            planner,
            session,
            formatter: ConsoleFormatter::default(),
            output: OutputFormat::Text,
        }
    }

    pub fn with_formatter(mut self, formatter: ConsoleFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    /// Run one turn and print its result
    pub async fn ask(&mut self, message: &str) -> Result<Turn, RunTurnError> {
        let turn = self
            .orchestrator
            .run_turn(&mut self.session, message, self.planner.as_ref())
            .await?;
        println!("{}", self.render(&turn));
        Ok(turn)
    }

    pub fn render(&self, turn: &Turn) -> String {
        match self.output {
            OutputFormat::Text => self.formatter.format_turn(turn),
            OutputFormat::Steps => self.formatter.format_steps(turn),
            OutputFormat::Json => self.formatter.format_json(turn),
        }
    }

    /// Read messages from stdin until EOF or `/quit`
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.print_welcome();
        self.run_with(BufReader::new(tokio::io::stdin())).await
    }

    pub async fn run_with<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> std::io::Result<()> {
        let mut lines = reader.lines();

        loop {
            eprint!("{} ", self.prompt());
            let Some(line) = lines.next_line().await? else {
                println!("Bye!");
                break;
            };
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            if line.starts_with('/') {
                if self.handle_command(line) {
                    break;
                }
                continue;
            }

            println!();
            if let Err(e) = self.ask(line).await {
                eprintln!("{} {}", "Error:".red(), e);
            }
            println!();
        }

        Ok(())
    }

    fn prompt(&self) -> String {
        match self.session.state.pending_clarification() {
            Some(_) => "reply>".yellow().to_string(),
            None => ">>>".to_string(),
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "analyst - chat mode".bold());
        println!();
        println!("Commands:");
        println!("  /help     - Show this help");
        println!("  /tools    - List available tools");
        println!("  /session  - Show session state");
        println!("  /quit     - Exit chat");
        println!();
    }

    /// Handle slash commands. Returns true if should exit.
    fn handle_command(&self, cmd: &str) -> bool {
        match cmd {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                true
            }
            "/help" | "/h" | "/?" => {
                self.print_welcome();
                false
            }
            "/tools" => {
                let definitions = self.orchestrator.contract().registry().definitions();
                println!("{}", ConsoleFormatter::format_catalog(definitions));
                false
            }
            "/session" => {
                println!("{}", self.session_summary());
                false
            }
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
                false
            }
        }
    }

    fn session_summary(&self) -> String {
        let state = &self.session.state;
        let mut lines = vec![format!("Turns: {}", self.session.turns().len())];
        if let Some(code) = state.generated_code() {
            lines.push(format!("Generated code for: {}", code.dataset_id));
        }
        if let Some(execution) = state.last_execution() {
            let status = if execution.is_success() { "succeeded" } else { "failed" };
            lines.push(format!("Last execution ({}): {}", execution.dataset_id, status));
        }
        if let Some(question) = state.pending_clarification() {
            lines.push(format!("Waiting for reply to: {}", question));
        }
        lines.join("\n")
    }
}
