//! Worker side of the process sandbox protocol.
//!
//! The parent writes one [`WorkerRequest`] as JSON to the worker's stdin and
//! closes it; the worker answers with one [`WorkerResponse`] on stdout and
//! exits.

use super::runtime::LuaRuntime;
use analyst_application::SandboxError;
use analyst_domain::{SandboxJob, SandboxLimits, SandboxOutcome};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Subcommand the parent uses to start a worker
pub const WORKER_SUBCOMMAND: &str = "sandbox-worker";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub job: SandboxJob,
    pub limits: SandboxLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerResponse {
    Outcome { outcome: SandboxOutcome },
    Error { message: String },
}

impl WorkerResponse {
    pub fn into_outcome(self) -> Result<SandboxOutcome, SandboxError> {
        match self {
            WorkerResponse::Outcome { outcome } => Ok(outcome),
            WorkerResponse::Error { message } => Err(SandboxError::Runtime(message)),
        }
    }
}

/// Read one request, run it, write one response.
///
/// Machinery failures are reported in-band as [`WorkerResponse::Error`];
/// the returned error only covers I/O on the pipes.
pub fn run_worker<R: Read, W: Write>(mut reader: R, mut writer: W) -> std::io::Result<()> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let response = match serde_json::from_str::<WorkerRequest>(&input) {
        Ok(request) => match LuaRuntime::new(request.limits).run(&request.job) {
            Ok(outcome) => WorkerResponse::Outcome { outcome },
            Err(e) => WorkerResponse::Error {
                message: e.to_string(),
            },
        },
        Err(e) => WorkerResponse::Error {
            message: format!("malformed worker request: {}", e),
        },
    };

    serde_json::to_writer(&mut writer, &response)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
