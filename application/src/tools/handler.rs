//! Tool handler port and argument helpers.

use super::keys;
use analyst_domain::{DatasetId, SessionContext, SessionState, ToolArguments, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Successful handler output, before contract checks.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    /// Must be a JSON object carrying the tool's declared result fields
    pub payload: Value,
    pub logs: Vec<String>,
}

impl HandlerOutput {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            logs: Vec::new(),
        }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }
}

/// Handler failure.
///
/// `Tool` carries a classified error; `Internal` is anything unexpected and
/// is reported as `TOOL_EXECUTION_ERROR`.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{error}")]
    Tool { error: ToolError, logs: Vec<String> },

    #[error("Internal handler error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn with_logs(error: ToolError, logs: Vec<String>) -> Self {
        HandlerError::Tool { error, logs }
    }
}

impl From<ToolError> for HandlerError {
    fn from(error: ToolError) -> Self {
        HandlerError::Tool {
            error,
            logs: Vec::new(),
        }
    }
}

/// One tool's execution function.
///
/// Receives the merged (validated + system) arguments and exclusive access
/// to the session state for the duration of the call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(
        &self,
        arguments: &ToolArguments,
        context: &SessionContext,
        state: &mut SessionState,
    ) -> Result<HandlerOutput, HandlerError>;
}

/// String argument that validation guarantees to be present.
pub(crate) fn required_str<'a>(
    arguments: &'a ToolArguments,
    key: &str,
) -> Result<&'a str, HandlerError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::Internal(format!("missing string argument '{}'", key)))
}

/// Optional string argument; explicit null counts as absent.
pub(crate) fn optional_str<'a>(arguments: &'a ToolArguments, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

pub(crate) fn dataset_id(arguments: &ToolArguments) -> Result<DatasetId, HandlerError> {
    let raw = required_str(arguments, keys::DATASET_ID)?;
    DatasetId::parse(raw).map_err(|e| ToolError::invalid_argument(e.to_string()).into())
}
