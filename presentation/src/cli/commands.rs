//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// How `catalog` renders the tool list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CatalogFormat {
    /// Names, descriptions and arguments
    #[default]
    Text,
    /// Catalog entries (name, description, outputDescription)
    Json,
    /// JSON Schema as sent to a tool-calling model
    Schema,
}

/// How turn results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Answer or question only
    #[default]
    Text,
    /// Every step with its envelope
    Steps,
    /// The full turn as JSON
    Json,
}

/// CLI arguments for analyst
#[derive(Parser, Debug)]
#[command(name = "analyst")]
#[command(author, version, about = "Tool-driven data analysis agent with sandboxed code execution")]
#[command(long_about = r#"
analyst answers questions about local datasets by planning a sequence of
tool calls: inspect the schema, load the rows, generate Lua analysis code,
run it in a sandbox, and answer from the result.

Configuration files are loaded from (in priority order):
1. ANALYST_* environment variables (e.g. ANALYST_SANDBOX__TIME_LIMIT_SECS=10)
2. --config <path>     Explicit config file
3. ./analyst.toml      Project-level config
4. ~/.config/analyst/config.toml   Global config

Example:
  analyst catalog --format schema
  analyst exec --dataset sales --code total.lua
  analyst replay script.json --message "Total sales by region"
  analyst chat --message "Which product sold best in 2024?"
"#)]
pub struct Cli {
    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tools available to the planner
    Catalog {
        #[arg(long, value_enum, default_value = "text")]
        format: CatalogFormat,
    },

    /// Run a Lua analysis file against a dataset in the sandbox
    Exec {
        /// Dataset id under the dataset root
        #[arg(long, value_name = "ID")]
        dataset: String,

        /// Lua source file
        #[arg(long, value_name = "FILE")]
        code: PathBuf,

        /// Wall-clock limit in seconds (overrides configuration)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Dataset directory (overrides configuration)
        #[arg(long, value_name = "DIR")]
        dataset_root: Option<PathBuf>,
    },

    /// Run one turn with tool calls read from a JSON script
    Replay {
        /// JSON array of {"tool": ..., "arguments": {...}}
        script: PathBuf,

        /// User message for the turn
        #[arg(long, short)]
        message: String,

        /// Dataset directory (overrides configuration)
        #[arg(long, value_name = "DIR")]
        dataset_root: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "steps")]
        output: OutputFormat,
    },

    /// Ask questions with a model-driven planner
    Chat {
        /// Run a single turn instead of an interactive session
        #[arg(long, short)]
        message: Option<String>,

        /// Dataset directory (overrides configuration)
        #[arg(long, value_name = "DIR")]
        dataset_root: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Worker side of the process sandbox (reads one job from stdin)
    #[command(name = "sandbox-worker", hide = true)]
    SandboxWorker,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_exec() {
        let cli = Cli::try_parse_from([
            "analyst", "-vv", "exec", "--dataset", "sales", "--code", "total.lua",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Exec {
                dataset,
                code,
                timeout,
                ..
            }) => {
                assert_eq!(dataset, "sales");
                assert_eq!(code, PathBuf::from("total.lua"));
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_worker_subcommand() {
        let cli = Cli::try_parse_from(["analyst", "sandbox-worker"]).unwrap();
        assert!(matches!(cli.command, Some(Command::SandboxWorker)));
    }

    #[test]
    fn test_catalog_default_format() {
        let cli = Cli::try_parse_from(["analyst", "catalog"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Catalog {
                format: CatalogFormat::Text
            })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "analyst", "replay", "s.json", "-m", "hi", "--no-config", "-v",
        ])
        .unwrap();
        assert!(cli.no_config);
        assert_eq!(cli.verbose, 1);
    }
}
