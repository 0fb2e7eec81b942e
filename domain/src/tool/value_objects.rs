//! Tool domain value objects: the uniform result envelope and its error taxonomy.
//!
//! Every tool invocation produces exactly one [`ToolResult`]. Failures carry a
//! [`ToolError`] whose [`ErrorKind`] decides how the orchestrator reacts:
//!
//! | Kind | Handling |
//! |------|----------|
//! | `INVALID_ARGUMENT` | Local, the agent can fix its arguments |
//! | `PREREQUISITE_MISSING` | Local, the agent can fetch the missing artifact |
//! | `GENERATION_FAILED` | Fails the turn (collaborator exhausted its attempts) |
//! | `EXECUTION_TIMEOUT` / `EXECUTION_NO_RESULT` / `EXECUTION_FAILURE` | Fed back for regeneration |
//! | `INVALID_TOOL_RESULT` / `TOOL_EXECUTION_ERROR` | Programming defect, fails the turn |

use super::entities::ToolArguments;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error taxonomy for tool failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArgument,
    PrerequisiteMissing,
    GenerationFailed,
    ExecutionTimeout,
    ExecutionNoResult,
    ExecutionFailure,
    InvalidToolResult,
    ToolExecutionError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::PrerequisiteMissing => "PREREQUISITE_MISSING",
            ErrorKind::GenerationFailed => "GENERATION_FAILED",
            ErrorKind::ExecutionTimeout => "EXECUTION_TIMEOUT",
            ErrorKind::ExecutionNoResult => "EXECUTION_NO_RESULT",
            ErrorKind::ExecutionFailure => "EXECUTION_FAILURE",
            ErrorKind::InvalidToolResult => "INVALID_TOOL_RESULT",
            ErrorKind::ToolExecutionError => "TOOL_EXECUTION_ERROR",
        }
    }

    /// Errors the calling agent is expected to correct on its own.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidArgument | ErrorKind::PrerequisiteMissing
        )
    }

    /// Failures of sandboxed code, eligible for regeneration.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            ErrorKind::ExecutionTimeout | ErrorKind::ExecutionNoResult | ErrorKind::ExecutionFailure
        )
    }

    /// Programming defects: logged at high severity, never retried.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidToolResult | ErrorKind::ToolExecutionError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVALID_ARGUMENT" => Ok(ErrorKind::InvalidArgument),
            "PREREQUISITE_MISSING" => Ok(ErrorKind::PrerequisiteMissing),
            "GENERATION_FAILED" => Ok(ErrorKind::GenerationFailed),
            "EXECUTION_TIMEOUT" => Ok(ErrorKind::ExecutionTimeout),
            "EXECUTION_NO_RESULT" => Ok(ErrorKind::ExecutionNoResult),
            "EXECUTION_FAILURE" => Ok(ErrorKind::ExecutionFailure),
            "INVALID_TOOL_RESULT" => Ok(ErrorKind::InvalidToolResult),
            "TOOL_EXECUTION_ERROR" => Ok(ErrorKind::ToolExecutionError),
            other => Err(format!("unknown error kind: {}", other)),
        }
    }
}

/// Error that occurred during tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Taxonomy entry
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional details (stack hints, serialization errors, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn prerequisite_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PrerequisiteMissing, message)
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GenerationFailed, message)
    }

    pub fn execution_timeout(limit_ms: u64) -> Self {
        Self::new(
            ErrorKind::ExecutionTimeout,
            format!("Analysis code exceeded its time limit of {} ms", limit_ms),
        )
    }

    pub fn execution_no_result() -> Self {
        Self::new(
            ErrorKind::ExecutionNoResult,
            "Analysis code finished without calling set_result",
        )
    }

    pub fn execution_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecutionFailure, message)
    }

    pub fn invalid_tool_result(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToolResult, message)
    }

    pub fn tool_execution_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolExecutionError, message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Outcome status of a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Structured metadata about tool execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Duration of execution in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Uniform outcome envelope of a tool invocation.
///
/// On success `payload` holds the tool-specific object; on error `error`
/// holds the classified failure and `final_arguments` the post-merge
/// arguments actually used. `logs` is the side channel (e.g. sandbox output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_arguments: Option<ToolArguments>,
    #[serde(default)]
    pub metadata: ToolResultMetadata,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Success,
            payload: Some(payload),
            error: None,
            logs: Vec::new(),
            final_arguments: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Error,
            payload: None,
            error: Some(error),
            logs: Vec::new(),
            final_arguments: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_final_arguments(mut self, arguments: ToolArguments) -> Self {
        self.final_arguments = Some(arguments);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Render the transport envelope.
    pub fn to_response(&self) -> ToolResponse {
        ToolResponse {
            status: self.status,
            result: self.payload.clone(),
            error: self.error.as_ref().map(|e| match &e.details {
                Some(details) => format!("{}\n{}", e.message, details),
                None => e.message.clone(),
            }),
            error_kind: self.error_kind(),
            logs: if self.logs.is_empty() {
                None
            } else {
                Some(self.logs.clone())
            },
        }
    }
}

/// Transport envelope returned to the calling agent:
/// `{ status, result?, error?, errorKind?, logs? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

/// Descriptive catalog entry exposed to the planning layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub output_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(ErrorKind::PrerequisiteMissing).unwrap(),
            json!("PREREQUISITE_MISSING")
        );
        assert_eq!(
            "EXECUTION_TIMEOUT".parse::<ErrorKind>().unwrap(),
            ErrorKind::ExecutionTimeout
        );
        assert!("NOPE".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn test_error_kind_classes() {
        assert!(ErrorKind::InvalidArgument.is_local());
        assert!(ErrorKind::PrerequisiteMissing.is_local());
        assert!(ErrorKind::ExecutionNoResult.is_execution_failure());
        assert!(ErrorKind::InvalidToolResult.is_defect());
        assert!(!ErrorKind::GenerationFailed.is_local());
        assert!(!ErrorKind::GenerationFailed.is_defect());
    }

    #[test]
    fn test_success_response_envelope() {
        let mut payload = Map::new();
        payload.insert("result".into(), json!(42));
        let result = ToolResult::success("execute_analysis_code", payload)
            .with_logs(vec!["hello".into()]);

        let response = serde_json::to_value(result.to_response()).unwrap();
        assert_eq!(
            response,
            json!({"status": "success", "result": {"result": 42}, "logs": ["hello"]})
        );
    }

    #[test]
    fn test_error_response_envelope() {
        let result = ToolResult::failure(
            "execute_analysis_code",
            ToolError::execution_failure("boom").with_details("line 3"),
        );

        let response = serde_json::to_value(result.to_response()).unwrap();
        assert_eq!(response["status"], "error");
        assert_eq!(response["errorKind"], "EXECUTION_FAILURE");
        assert_eq!(response["error"], "boom\nline 3");
        assert!(response.get("result").is_none());
        assert!(response.get("logs").is_none());
    }

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::invalid_argument("dataset_id: required");
        assert_eq!(err.to_string(), "[INVALID_ARGUMENT] dataset_id: required");
    }
}
