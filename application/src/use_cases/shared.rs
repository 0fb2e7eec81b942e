//! Shared utilities for use cases and tool handlers.
//!
//! Contains cancellation checking and the timeout/retry wrapper applied to
//! every collaborator call.

use crate::config::CollaboratorPolicy;
use crate::ports::collaborator::CollaboratorError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Check if cancellation has been requested.
pub(crate) fn is_cancelled(token: &Option<CancellationToken>) -> bool {
    token.as_ref().is_some_and(CancellationToken::is_cancelled)
}

/// Run a collaborator call under the policy's timeout, retrying transient
/// failures until the attempt budget is spent.
pub(crate) async fn with_retry<T, E, F, Fut>(
    policy: CollaboratorPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, E>
where
    E: CollaboratorError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out(policy.timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(
                    "{} failed (attempt {}/{}), retrying: {}",
                    operation, attempt, attempts, e
                );
            }
            Err(e) => return Err(e),
        }
    }
}
