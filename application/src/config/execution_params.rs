//! Execution parameters: turn loop control.
//!
//! [`ExecutionParams`] groups the static parameters that control the turn
//! loop in [`TurnOrchestrator`](crate::use_cases::run_turn::TurnOrchestrator)
//! and the collaborator calls made by tool handlers. These are
//! application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turn loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Maximum tool calls dispatched in one turn.
    pub max_steps: usize,
    /// Execution failures tolerated before the turn fails.
    pub max_regenerations: usize,
    /// Wall-clock budget for each collaborator call.
    pub collaborator_timeout: Duration,
    /// Attempts per collaborator call for transient failures.
    pub collaborator_attempts: usize,
    /// Wall-clock budget for one sandbox job.
    pub sandbox_time_limit: Duration,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_steps: 16,
            max_regenerations: 3,
            collaborator_timeout: Duration::from_secs(60),
            collaborator_attempts: 2,
            sandbox_time_limit: Duration::from_secs(5),
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_max_regenerations(mut self, max: usize) -> Self {
        self.max_regenerations = max;
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    pub fn with_collaborator_attempts(mut self, attempts: usize) -> Self {
        self.collaborator_attempts = attempts;
        self
    }

    pub fn with_sandbox_time_limit(mut self, limit: Duration) -> Self {
        self.sandbox_time_limit = limit;
        self
    }

    pub fn collaborator_policy(&self) -> CollaboratorPolicy {
        CollaboratorPolicy {
            timeout: self.collaborator_timeout,
            attempts: self.collaborator_attempts.max(1),
        }
    }
}

/// Timeout and retry bound for one collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollaboratorPolicy {
    pub timeout: Duration,
    pub attempts: usize,
}

impl Default for CollaboratorPolicy {
    fn default() -> Self {
        ExecutionParams::default().collaborator_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ExecutionParams::default();
        assert_eq!(params.max_steps, 16);
        assert_eq!(params.max_regenerations, 3);
        assert_eq!(params.collaborator_attempts, 2);
        assert_eq!(params.sandbox_time_limit, Duration::from_secs(5));
    }

    #[test]
    fn test_builder() {
        let params = ExecutionParams::default()
            .with_max_steps(4)
            .with_max_regenerations(0)
            .with_sandbox_time_limit(Duration::from_millis(250));

        assert_eq!(params.max_steps, 4);
        assert_eq!(params.max_regenerations, 0);
        assert_eq!(params.sandbox_time_limit, Duration::from_millis(250));
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        let policy = ExecutionParams::default()
            .with_collaborator_attempts(0)
            .collaborator_policy();
        assert_eq!(policy.attempts, 1);
    }
}
