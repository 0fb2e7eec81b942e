//! CLI entrypoint for analyst
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use analyst_application::{
    CodeGenerationPort, ConversationLogger, DatasetContentPort, ReportGenerationPort, SandboxPort,
    StandardCollaborators, ToolRegistry, ToolSchemaPort, TurnOrchestrator, TurnProgressNotifier,
    standard_registry,
};
use analyst_domain::{AnalysisSession, DatasetId, SandboxJob, SessionContext, Turn, TurnState};
use analyst_infrastructure::{
    ConfigLoader, FileConfig, JsonSchemaToolConverter, JsonlConversationLogger, LocalDatasetStore,
    OpenAiCompatibleClient, ProcessSandbox, ScriptedPlanner, UnconfiguredGenerator, run_worker,
};
use analyst_presentation::{
    CatalogFormat, ChatRepl, Cli, Command, ConsoleFormatter, OutputFormat, OutputFormatter,
    ProgressReporter,
};
use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The worker speaks JSON on stdout; nothing else may write there
    if matches!(cli.command, Some(Command::SandboxWorker)) {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        run_worker(stdin.lock(), stdout.lock()).context("sandbox worker failed")?;
        return Ok(());
    }

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };

    let log_file = cli.log_file.clone().or_else(|| config.logging.file_path());
    let _guard = init_logging(cli.verbose, log_file.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(cli, config))
}

/// Install the tracing subscriber. The returned guard flushes the log file
/// and must live until `main` returns.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        })
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return Ok(None);
    };

    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {}", directory.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(Some(guard))
}

async fn run(cli: Cli, config: FileConfig) -> Result<()> {
    info!("Starting analyst");

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Catalog { format } => {
            let registry = build_registry(&config, None)?;
            print_catalog(&registry, format)
        }
        Command::Exec {
            dataset,
            code,
            timeout,
            dataset_root,
        } => {
            let mut config = config;
            if let Some(root) = dataset_root {
                config.datasets.root = root;
            }
            if let Some(secs) = timeout {
                config.sandbox.time_limit_secs = secs;
            }
            config.validate()?;
            exec(&config, &dataset, &code).await
        }
        Command::Replay {
            script,
            message,
            dataset_root,
            output,
        } => {
            let config = with_dataset_root(config, dataset_root);
            let registry = Arc::new(build_registry(&config, None)?);
            let orchestrator = build_orchestrator(&config, registry, cli.quiet);
            let planner = ScriptedPlanner::load(&script)
                .with_context(|| format!("failed to load script {}", script.display()))?;

            let mut session = new_session();
            let turn = orchestrator
                .run_turn(&mut session, &message, &planner)
                .await?;

            let formatter = ConsoleFormatter::new(cli.verbose > 0);
            println!("{}", render(&formatter, &turn, output));
            exit_status(&turn)
        }
        Command::Chat {
            message,
            dataset_root,
            output,
        } => {
            let config = with_dataset_root(config, dataset_root);
            let Some(client) = build_client(&config)? else {
                bail!(
                    "chat needs a model endpoint: set [generation] base_url in analyst.toml \
                     or ANALYST_GENERATION__BASE_URL"
                );
            };
            let client = Arc::new(client);
            let registry = Arc::new(build_registry(&config, Some(client.clone()))?);
            let orchestrator = build_orchestrator(&config, registry, cli.quiet);

            let mut repl = ChatRepl::new(orchestrator, client, new_session())
                .with_formatter(ConsoleFormatter::new(cli.verbose > 0))
                .with_output(output);

            match message {
                Some(message) => {
                    let turn = repl.ask(&message).await?;
                    exit_status(&turn)
                }
                None => {
                    repl.run().await?;
                    Ok(())
                }
            }
        }
        Command::SandboxWorker => Ok(()),
    }
}

fn with_dataset_root(mut config: FileConfig, root: Option<PathBuf>) -> FileConfig {
    if let Some(root) = root {
        config.datasets.root = root;
    }
    config
}

fn new_session() -> AnalysisSession {
    let user = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    let session_id = format!("cli-{}", std::process::id());
    AnalysisSession::new(SessionContext::new(user, session_id))
}

fn build_sandbox(config: &FileConfig) -> Result<Arc<dyn SandboxPort>> {
    let limits = config.sandbox_limits();
    let sandbox: Arc<dyn SandboxPort> = match config.worker_path() {
        Some(path) => Arc::new(ProcessSandbox::new(path, limits)),
        None => Arc::new(ProcessSandbox::current_exe(limits)?),
    };
    info!("Sandbox backend: {}", sandbox.name());
    Ok(sandbox)
}

fn build_client(config: &FileConfig) -> Result<Option<OpenAiCompatibleClient>> {
    let generation = &config.generation;
    if !generation.is_configured() {
        return Ok(None);
    }

    let timeout = Duration::from_secs(config.execution.collaborator_timeout_secs);
    let mut client = OpenAiCompatibleClient::new(&generation.base_url, &generation.model, timeout)?;
    match generation.api_key() {
        Some(key) => client = client.with_api_key(key),
        None => warn!(
            "No API key in ${}; calling {} without authentication",
            generation.api_key_env, generation.base_url
        ),
    }
    Ok(Some(client))
}

/// Registry wired to the configured collaborators. Without an endpoint,
/// generation tools fail with `GENERATION_FAILED`.
fn build_registry(
    config: &FileConfig,
    client: Option<Arc<OpenAiCompatibleClient>>,
) -> Result<ToolRegistry> {
    let client = match client {
        Some(client) => Some(client),
        None => build_client(config)?.map(Arc::new),
    };
    let code_generator: Arc<dyn CodeGenerationPort>;
    let report_generator: Arc<dyn ReportGenerationPort>;
    match client {
        Some(client) => {
            code_generator = client.clone();
            report_generator = client;
        }
        None => {
            code_generator = Arc::new(UnconfiguredGenerator);
            report_generator = Arc::new(UnconfiguredGenerator);
        }
    }

    let store = Arc::new(LocalDatasetStore::new(&config.datasets.root));
    let registry = standard_registry(
        StandardCollaborators {
            content: store.clone(),
            schemas: store,
            code_generator,
            report_generator,
            sandbox: build_sandbox(config)?,
        },
        &config.execution_params(),
    )?;
    Ok(registry)
}

fn build_orchestrator(
    config: &FileConfig,
    registry: Arc<ToolRegistry>,
    quiet: bool,
) -> TurnOrchestrator {
    let progress: Arc<dyn TurnProgressNotifier> = if quiet {
        Arc::new(analyst_application::NoTurnProgress)
    } else {
        Arc::new(ProgressReporter::new())
    };

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling the current turn");
            ctrl_c.cancel();
        }
    });

    let mut orchestrator = TurnOrchestrator::new(registry, config.execution_params())
        .with_progress(progress)
        .with_cancellation(token);

    if let Some(path) = config.logging.transcript_path() {
        match JsonlConversationLogger::open(&path) {
            Ok(logger) => {
                info!("Writing transcript to {}", logger.path().display());
                let logger: Arc<dyn ConversationLogger> = Arc::new(logger);
                orchestrator = orchestrator.with_conversation_logger(logger);
            }
            Err(e) => warn!("Transcript disabled, cannot open {}: {}", path.display(), e),
        }
    }

    orchestrator
}

fn print_catalog(registry: &ToolRegistry, format: CatalogFormat) -> Result<()> {
    let output = match format {
        CatalogFormat::Text => ConsoleFormatter::format_catalog(registry.definitions()),
        CatalogFormat::Json => ConsoleFormatter::format_catalog_json(&registry.catalog()),
        CatalogFormat::Schema => serde_json::to_string_pretty(
            &JsonSchemaToolConverter.all_tools_schema(registry.definitions()),
        )?,
    };
    println!("{}", output);
    Ok(())
}

/// Run a Lua file directly against a dataset, outside of any turn.
async fn exec(config: &FileConfig, dataset: &str, code: &Path) -> Result<()> {
    let id = DatasetId::parse(dataset)?;
    let source = std::fs::read_to_string(code)
        .with_context(|| format!("failed to read {}", code.display()))?;

    let store = LocalDatasetStore::new(&config.datasets.root);
    let rows = store.fetch_parsed_rows(&id).await?;
    info!("Loaded {} rows from dataset '{}'", rows.len(), id);

    let params = config.execution_params();
    let job = SandboxJob::new(source, serde_json::Value::Array(rows), params.sandbox_time_limit);
    let outcome = build_sandbox(config)?.run(job).await?;

    print!("{}", ConsoleFormatter::format_outcome(&outcome));
    if !outcome.is_success() {
        bail!("analysis code did not produce a result");
    }
    Ok(())
}

fn render(formatter: &ConsoleFormatter, turn: &Turn, output: OutputFormat) -> String {
    match output {
        OutputFormat::Text => formatter.format_turn(turn),
        OutputFormat::Steps => formatter.format_steps(turn),
        OutputFormat::Json => formatter.format_json(turn),
    }
}

/// A failed turn makes the process exit non-zero; a pause does not.
fn exit_status(turn: &Turn) -> Result<()> {
    match &turn.state {
        TurnState::Failed { failure } => bail!("turn {} failed: {}", turn.number, failure),
        _ => Ok(()),
    }
}
