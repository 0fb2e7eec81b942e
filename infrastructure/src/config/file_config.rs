//! Raw TOML configuration data types
//!
//! These structs mirror the structure of the TOML config file and are
//! deserialized directly. Conversion methods produce the application and
//! domain parameter types.

use analyst_application::ExecutionParams;
use analyst_domain::SandboxLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("sandbox.time_limit_secs cannot be 0")]
    InvalidTimeLimit,

    #[error("execution.collaborator_timeout_secs cannot be 0")]
    InvalidCollaboratorTimeout,

    #[error("execution.max_steps cannot be 0")]
    InvalidMaxSteps,

    #[error("execution.collaborator_attempts cannot be 0")]
    InvalidAttempts,

    #[error("sandbox.memory_limit_mb cannot be 0")]
    InvalidMemoryLimit,

    #[error("generation.model cannot be empty when base_url is set")]
    EmptyModelName,
}

/// Raw sandbox configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSandboxConfig {
    /// Wall-clock limit per job
    pub time_limit_secs: u64,
    pub max_log_lines: usize,
    pub max_log_line_chars: usize,
    pub memory_limit_mb: usize,
    /// Worker binary that runs each job; empty means the current executable
    pub worker_path: String,
}

impl Default for FileSandboxConfig {
    fn default() -> Self {
        let limits = SandboxLimits::default();
        Self {
            time_limit_secs: 5,
            max_log_lines: limits.max_log_lines,
            max_log_line_chars: limits.max_log_line_chars,
            memory_limit_mb: limits.memory_limit_bytes / (1024 * 1024),
            worker_path: String::new(),
        }
    }
}

/// Raw turn loop configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutionConfig {
    pub max_steps: usize,
    pub max_regenerations: usize,
    pub collaborator_timeout_secs: u64,
    pub collaborator_attempts: usize,
}

impl Default for FileExecutionConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            max_steps: params.max_steps,
            max_regenerations: params.max_regenerations,
            collaborator_timeout_secs: params.collaborator_timeout.as_secs(),
            collaborator_attempts: params.collaborator_attempts,
        }
    }
}

/// Raw dataset store configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDatasetsConfig {
    pub root: PathBuf,
}

impl Default for FileDatasetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./datasets"),
        }
    }
}

/// Raw model endpoint configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGenerationConfig {
    /// OpenAI-compatible base URL; empty means not configured
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for FileGenerationConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl FileGenerationConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Diagnostic log file; empty means stderr only
    pub file: String,
    /// JSONL conversation transcript; empty disables it
    pub transcript: String,
}

impl FileLoggingConfig {
    pub fn file_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.file)
    }

    pub fn transcript_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.transcript)
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Complete configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub sandbox: FileSandboxConfig,
    pub execution: FileExecutionConfig,
    pub datasets: FileDatasetsConfig,
    pub generation: FileGenerationConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Reject values that would make every turn fail
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.sandbox.time_limit_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeLimit);
        }
        if self.sandbox.memory_limit_mb == 0 {
            return Err(ConfigValidationError::InvalidMemoryLimit);
        }
        if self.execution.collaborator_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidCollaboratorTimeout);
        }
        if self.execution.max_steps == 0 {
            return Err(ConfigValidationError::InvalidMaxSteps);
        }
        if self.execution.collaborator_attempts == 0 {
            return Err(ConfigValidationError::InvalidAttempts);
        }
        if self.generation.is_configured() && self.generation.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        Ok(())
    }

    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_max_steps(self.execution.max_steps)
            .with_max_regenerations(self.execution.max_regenerations)
            .with_collaborator_timeout(Duration::from_secs(
                self.execution.collaborator_timeout_secs,
            ))
            .with_collaborator_attempts(self.execution.collaborator_attempts)
            .with_sandbox_time_limit(Duration::from_secs(self.sandbox.time_limit_secs))
    }

    pub fn sandbox_limits(&self) -> SandboxLimits {
        SandboxLimits {
            max_log_lines: self.sandbox.max_log_lines,
            max_log_line_chars: self.sandbox.max_log_line_chars,
            memory_limit_bytes: self.sandbox.memory_limit_mb.saturating_mul(1024 * 1024),
        }
    }

    pub fn worker_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.sandbox.worker_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_application_params() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.execution_params(), ExecutionParams::default());
        assert_eq!(config.sandbox_limits(), SandboxLimits::default());
        assert!(!config.generation.is_configured());
        assert!(config.logging.transcript_path().is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: FileConfig = toml::from_str(
            r#"
[sandbox]
time_limit_secs = 2

[execution]
max_regenerations = 1

[logging]
transcript = "/tmp/turns.jsonl"
"#,
        )
        .unwrap();

        assert_eq!(config.sandbox.max_log_lines, 200);
        let params = config.execution_params();
        assert_eq!(params.sandbox_time_limit, Duration::from_secs(2));
        assert_eq!(params.max_regenerations, 1);
        assert_eq!(params.max_steps, 16);
        assert_eq!(
            config.logging.transcript_path(),
            Some(PathBuf::from("/tmp/turns.jsonl"))
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = FileConfig::default();
        config.sandbox.time_limit_secs = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::InvalidTimeLimit));

        let mut config = FileConfig::default();
        config.execution.max_steps = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::InvalidMaxSteps));

        let mut config = FileConfig::default();
        config.execution.collaborator_attempts = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::InvalidAttempts));

        let mut config = FileConfig::default();
        config.generation.base_url = "http://localhost:8080/v1".into();
        config.generation.model = " ".into();
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyModelName));
    }

    #[test]
    fn test_memory_limit_in_bytes() {
        let mut config = FileConfig::default();
        config.sandbox.memory_limit_mb = 8;
        assert_eq!(config.sandbox_limits().memory_limit_bytes, 8 * 1024 * 1024);
    }
}
