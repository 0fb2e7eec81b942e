//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid tool schema: {0}")]
    InvalidSchema(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Invalid dataset id: {0}")]
    InvalidDatasetId(String),

    #[error("Invalid turn transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::DuplicateTool("parse_dataset".to_string()).is_cancelled());
        assert!(!DomainError::InvalidSchema("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_transition_display() {
        let error = DomainError::InvalidTransition {
            from: "answered".to_string(),
            to: "in_progress".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid turn transition: answered -> in_progress");
    }
}
