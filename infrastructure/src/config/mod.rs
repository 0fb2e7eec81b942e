//! Configuration file loading for analyst
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ANALYST_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./analyst.toml` or `./.analyst.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/analyst/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileDatasetsConfig, FileExecutionConfig,
    FileGenerationConfig, FileLoggingConfig, FileSandboxConfig,
};
pub use loader::{ConfigError, ConfigLoader};
