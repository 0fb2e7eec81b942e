//! Lua 5.4 runtime for a single sandbox job.
//!
//! Every job gets a fresh VM. The deadline is enforced from inside the VM by
//! an instruction-count hook that raises an error once the wall clock passes
//! it; with `pcall`/`xpcall` removed that error always unwinds to the top.

use super::capabilities::{self, Captures};
use analyst_application::SandboxError;
use analyst_domain::{LogBuffer, SandboxFailure, SandboxJob, SandboxLimits, SandboxOutcome};
use mlua::prelude::*;
use mlua::{HookTriggers, LuaOptions, StdLib, VmState};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// Chunk name; Lua prefixes error messages with `analysis:<line>:`.
const CHUNK_NAME: &str = "=analysis";
const LOCATION_PREFIX: &str = "analysis:";

/// Instructions between deadline checks
const HOOK_INTERVAL: u32 = 1_000;

/// Runs jobs on the calling thread. Blocking, and only interruptible between
/// VM instructions, so it runs inside a worker process that can be killed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LuaRuntime {
    limits: SandboxLimits,
}

impl LuaRuntime {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Execute the job and classify how it ended.
    ///
    /// `Err` is reserved for failures to set up the VM; everything the code
    /// itself does ends up in the outcome.
    pub fn run(&self, job: &SandboxJob) -> Result<SandboxOutcome, SandboxError> {
        let started = Instant::now();
        let deadline = started + job.time_limit;

        let lua = Lua::new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
            LuaOptions::new(),
        )
        .map_err(|e| SandboxError::Runtime(format!("Lua VM setup failed: {}", e)))?;
        lua.set_memory_limit(self.limits.memory_limit_bytes)
            .map_err(|e| SandboxError::Runtime(format!("memory limit rejected: {}", e)))?;

        let captures = Arc::new(Mutex::new(Captures::new(LogBuffer::new(&self.limits))));
        capabilities::install(&lua, &job.input_data, Arc::clone(&captures), deadline)
            .map_err(|e| SandboxError::Runtime(format!("capability setup failed: {}", e)))?;

        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                if Instant::now() >= deadline {
                    Err(LuaError::runtime("time limit exceeded"))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );

        let run = lua.load(job.source_code.as_str()).set_name(CHUNK_NAME).exec();
        let timed_out = Instant::now() >= deadline;

        let (logs, published) = {
            let mut state = captures
                .lock()
                .map_err(|e| SandboxError::Runtime(format!("capture lock poisoned: {}", e)))?;
            let logs = std::mem::replace(&mut state.logs, LogBuffer::new(&self.limits));
            (logs.into_lines(), state.published.take())
        };

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            timed_out,
            "Sandbox job finished"
        );

        if timed_out {
            return Ok(SandboxOutcome::timeout(job.time_limit_ms(), logs));
        }

        let outcome = match (run, published) {
            (Err(e), _) => SandboxOutcome::failed(raised(&e), logs),
            (Ok(()), None) => SandboxOutcome::failed(SandboxFailure::NoResultPublished, logs),
            (Ok(()), Some(Ok(value))) => SandboxOutcome::published(value, logs),
            (Ok(()), Some(Err(reason))) => {
                SandboxOutcome::failed(SandboxFailure::NonSerializableResult { reason }, logs)
            }
        };
        Ok(outcome)
    }
}

fn raised(error: &LuaError) -> SandboxFailure {
    let text = match error {
        LuaError::RuntimeError(message) => message.clone(),
        LuaError::SyntaxError { message, .. } => message.clone(),
        LuaError::MemoryError(_) => "memory limit exceeded".to_string(),
        LuaError::CallbackError { cause, .. } => return raised(cause),
        other => other.to_string(),
    };
    let (message, location) = split_location(&text);
    SandboxFailure::RaisedException { message, location }
}

/// Split `analysis:12: boom\nstack traceback: ...` into `("boom", Some("line 12"))`.
fn split_location(text: &str) -> (String, Option<String>) {
    let first = text
        .split("\nstack traceback:")
        .next()
        .unwrap_or(text)
        .trim();

    if let Some(rest) = first.strip_prefix(LOCATION_PREFIX)
        && let Some((line, message)) = rest.split_once(':')
        && !line.is_empty()
        && line.chars().all(|c| c.is_ascii_digit())
    {
        return (message.trim().to_string(), Some(format!("line {}", line)));
    }
    (first.to_string(), None)
}
