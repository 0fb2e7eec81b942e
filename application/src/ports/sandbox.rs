//! Sandbox port
//!
//! The isolation mechanism is swappable: any backend that honors the
//! [`SandboxJob`] → [`SandboxOutcome`] contract can run analysis code.

use analyst_domain::{SandboxJob, SandboxOutcome};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of the sandbox machinery itself, as opposed to the code it ran.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Failed to start sandbox: {0}")]
    Spawn(String),

    #[error("Sandbox protocol error: {0}")]
    Protocol(String),

    #[error("Sandbox runtime error: {0}")]
    Runtime(String),
}

/// Runs one job in a fresh, isolated context.
///
/// Implementations must terminate the context when the job's time limit
/// elapses and report [`SandboxFailure::Timeout`](analyst_domain::SandboxFailure::Timeout)
/// without any captured result.
#[async_trait]
pub trait SandboxPort: Send + Sync {
    async fn run(&self, job: SandboxJob) -> Result<SandboxOutcome, SandboxError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}
