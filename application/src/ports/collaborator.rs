//! Shared error contract for external collaborators.

use std::time::Duration;

/// Error of a collaborator call that may be retried.
///
/// Implemented by every port error so timeouts and transient failures are
/// handled the same way regardless of which collaborator failed.
pub trait CollaboratorError: std::error::Error + Send + Sync + 'static {
    /// Whether another attempt may succeed.
    fn is_transient(&self) -> bool;

    /// Error produced when the call exceeded its time budget.
    fn timed_out(after: Duration) -> Self;
}
