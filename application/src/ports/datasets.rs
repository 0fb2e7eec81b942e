//! Dataset collaborator ports
//!
//! Storage of datasets is external. The core only reads parsed rows and
//! column schemas through these traits.

use super::collaborator::CollaboratorError;
use analyst_domain::{DatasetId, DatasetSchema};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from dataset collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(String),

    #[error("Dataset '{0}' has no parsed content available")]
    NotAvailable(String),

    #[error("Dataset '{id}' is malformed: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Dataset storage unavailable: {0}")]
    Unavailable(String),

    #[error("Dataset request timed out after {0:?}")]
    Timeout(Duration),
}

impl CollaboratorError for DatasetError {
    fn is_transient(&self) -> bool {
        matches!(self, DatasetError::Unavailable(_) | DatasetError::Timeout(_))
    }

    fn timed_out(after: Duration) -> Self {
        DatasetError::Timeout(after)
    }
}

/// Provider of parsed dataset rows
#[async_trait]
pub trait DatasetContentPort: Send + Sync {
    /// Fetch all records of a dataset, each a JSON object.
    async fn fetch_parsed_rows(&self, id: &DatasetId) -> Result<Vec<Value>, DatasetError>;
}

/// Provider of dataset schemas
#[async_trait]
pub trait DatasetSchemaPort: Send + Sync {
    async fn fetch_schema(&self, id: &DatasetId) -> Result<DatasetSchema, DatasetError>;
}
