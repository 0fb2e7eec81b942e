//! Infrastructure layer for analyst
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the Lua sandbox and its process worker, the local
//! dataset store, model clients, configuration loading and transcripts.

pub mod config;
pub mod datasets;
pub mod logging;
pub mod providers;
pub mod sandbox;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigLoader, ConfigValidationError, FileConfig, FileGenerationConfig,
    FileLoggingConfig, FileSandboxConfig,
};
pub use datasets::LocalDatasetStore;
pub use logging::JsonlConversationLogger;
pub use providers::{
    OpenAiCompatibleClient, OpenAiError, ScriptError, ScriptedPlanner, UnconfiguredGenerator,
};
pub use sandbox::{
    LuaRuntime, ProcessSandbox, WORKER_SUBCOMMAND, WorkerRequest, WorkerResponse, run_worker,
};
pub use tools::JsonSchemaToolConverter;
