//! Generation collaborator ports
//!
//! Code and report generation are delegated to an external service
//! (typically an LLM). The core only supplies context and checks the
//! output is non-empty.

use super::collaborator::CollaboratorError;
use analyst_domain::{DatasetId, ErrorKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from generation collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Generation service not configured")]
    NotConfigured,

    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Generation returned empty output")]
    EmptyOutput,

    #[error("Generation service unavailable: {0}")]
    Unavailable(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

impl CollaboratorError for GenerationError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Unavailable(_) | GenerationError::Timeout(_)
        )
    }

    fn timed_out(after: Duration) -> Self {
        GenerationError::Timeout(after)
    }
}

/// Failing code and its classification, carried into a regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousAttempt {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Error text as recorded by the sandbox
    pub error_message: String,
    /// The planner's own description of what went wrong
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner_note: Option<String>,
}

/// Input to code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeRequest {
    pub goal: String,
    pub dataset_id: DatasetId,
    /// Rendered column schema
    pub schema_context: String,
    pub previous_attempt: Option<PreviousAttempt>,
}

/// Input to report generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub dataset_id: DatasetId,
    pub focus: Option<String>,
    /// Rendered analysis result
    pub result_summary: String,
}

/// Produces analysis code
#[async_trait]
pub trait CodeGenerationPort: Send + Sync {
    async fn generate_code(&self, request: &CodeRequest) -> Result<String, GenerationError>;
}

/// Produces narrative reports from analysis results
#[async_trait]
pub trait ReportGenerationPort: Send + Sync {
    async fn generate_report(&self, request: &ReportRequest) -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::Unavailable("503".into()).is_transient());
        assert!(GenerationError::timed_out(Duration::from_secs(1)).is_transient());
        assert!(!GenerationError::EmptyOutput.is_transient());
        assert!(!GenerationError::NotConfigured.is_transient());
    }

    #[test]
    fn test_previous_attempt_is_lossless() {
        let attempt = PreviousAttempt {
            code: "set_result(data[1].Sales)".into(),
            error_kind: Some(ErrorKind::ExecutionFailure),
            error_message: "attempt to index a nil value".into(),
            planner_note: Some("column name is wrong".into()),
        };
        let value = serde_json::to_value(&attempt).unwrap();
        assert_eq!(value["error_kind"], json!("EXECUTION_FAILURE"));
        let back: PreviousAttempt = serde_json::from_value(value).unwrap();
        assert_eq!(back, attempt);
    }
}
