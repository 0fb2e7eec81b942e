//! Sandbox job and outcome types

use crate::tool::value_objects::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One execution request. Consumed by exactly one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxJob {
    /// Untrusted source code
    pub source_code: String,
    /// Data exposed to the code as `data`
    pub input_data: Value,
    /// Wall-clock budget
    pub time_limit: Duration,
}

impl SandboxJob {
    pub fn new(source_code: impl Into<String>, input_data: Value, time_limit: Duration) -> Self {
        Self {
            source_code: source_code.into(),
            input_data,
            time_limit,
        }
    }

    pub fn time_limit_ms(&self) -> u64 {
        u64::try_from(self.time_limit.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Resource bounds shared by every job of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// Maximum captured log lines
    pub max_log_lines: usize,
    /// Maximum characters kept per log line
    pub max_log_line_chars: usize,
    /// VM memory ceiling in bytes
    pub memory_limit_bytes: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_log_lines: 200,
            max_log_line_chars: 1000,
            memory_limit_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Why a run did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SandboxFailure {
    /// Uncaught error raised by the code
    RaisedException {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    /// The wall-clock budget was exceeded
    Timeout { limit_ms: u64 },
    /// The code finished without calling `set_result`
    NoResultPublished,
    /// The published value has no pure-data form
    NonSerializableResult { reason: String },
}

impl SandboxFailure {
    /// Classify into the tool error taxonomy.
    pub fn to_tool_error(&self) -> ToolError {
        match self {
            SandboxFailure::RaisedException { message, location } => {
                let error = ToolError::execution_failure(message.clone());
                match location {
                    Some(location) => error.with_details(format!("at {}", location)),
                    None => error,
                }
            }
            SandboxFailure::Timeout { limit_ms } => ToolError::execution_timeout(*limit_ms),
            SandboxFailure::NoResultPublished => ToolError::execution_no_result(),
            SandboxFailure::NonSerializableResult { reason } => {
                ToolError::execution_failure("Published result is not serializable")
                    .with_details(reason.clone())
            }
        }
    }
}

impl std::fmt::Display for SandboxFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxFailure::RaisedException { message, location: Some(loc) } => {
                write!(f, "raised exception at {}: {}", loc, message)
            }
            SandboxFailure::RaisedException { message, location: None } => {
                write!(f, "raised exception: {}", message)
            }
            SandboxFailure::Timeout { limit_ms } => write!(f, "timed out after {}ms", limit_ms),
            SandboxFailure::NoResultPublished => write!(f, "no result published"),
            SandboxFailure::NonSerializableResult { reason } => {
                write!(f, "non-serializable result: {}", reason)
            }
        }
    }
}

/// Result of one run: either a captured value or a failure, plus logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_result: Option<Value>,
    #[serde(default)]
    pub captured_logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<SandboxFailure>,
}

impl SandboxOutcome {
    pub fn published(value: Value, logs: Vec<String>) -> Self {
        Self {
            captured_result: Some(value),
            captured_logs: logs,
            failure: None,
        }
    }

    /// A failed run never carries a result.
    pub fn failed(failure: SandboxFailure, logs: Vec<String>) -> Self {
        Self {
            captured_result: None,
            captured_logs: logs,
            failure: Some(failure),
        }
    }

    pub fn timeout(limit_ms: u64, logs: Vec<String>) -> Self {
        Self::failed(SandboxFailure::Timeout { limit_ms }, logs)
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.captured_result.is_some()
    }

    /// Returns the published value or the classified error.
    pub fn into_result(self) -> Result<(Value, Vec<String>), (ToolError, Vec<String>)> {
        match (self.failure, self.captured_result) {
            (None, Some(value)) => Ok((value, self.captured_logs)),
            (Some(failure), _) => Err((failure.to_tool_error(), self.captured_logs)),
            (None, None) => Err((ToolError::execution_no_result(), self.captured_logs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_failure_classification() {
        let cases = [
            (
                SandboxFailure::RaisedException {
                    message: "boom".into(),
                    location: Some("line 3".into()),
                },
                ErrorKind::ExecutionFailure,
            ),
            (SandboxFailure::Timeout { limit_ms: 5000 }, ErrorKind::ExecutionTimeout),
            (SandboxFailure::NoResultPublished, ErrorKind::ExecutionNoResult),
            (
                SandboxFailure::NonSerializableResult { reason: "function".into() },
                ErrorKind::ExecutionFailure,
            ),
        ];
        for (failure, kind) in cases {
            assert_eq!(failure.to_tool_error().kind, kind, "{}", failure);
        }
    }

    #[test]
    fn test_raised_exception_keeps_location() {
        let error = SandboxFailure::RaisedException {
            message: "attempt to index a nil value".into(),
            location: Some("line 4".into()),
        }
        .to_tool_error();
        assert_eq!(error.details.as_deref(), Some("at line 4"));
    }

    #[test]
    fn test_failed_outcome_has_no_result() {
        let outcome = SandboxOutcome::timeout(100, vec!["started".into()]);
        assert!(!outcome.is_success());
        assert!(outcome.captured_result.is_none());
        let (error, logs) = outcome.into_result().unwrap_err();
        assert_eq!(error.kind, ErrorKind::ExecutionTimeout);
        assert_eq!(logs, vec!["started"]);
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = SandboxOutcome::failed(SandboxFailure::NoResultPublished, vec![]);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"captured_logs": [], "failure": {"kind": "no_result_published"}}));
        let back: SandboxOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_job_time_limit_ms() {
        let job = SandboxJob::new("return 1", json!([]), Duration::from_millis(1500));
        assert_eq!(job.time_limit_ms(), 1500);
    }
}
