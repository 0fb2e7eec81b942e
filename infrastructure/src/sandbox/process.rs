//! Process-isolated sandbox backend.
//!
//! Each job runs in a fresh `analyst sandbox-worker` process with an empty
//! environment. The parent enforces the wall-clock deadline by killing the
//! process; on Linux the kernel also caps CPU time and kills the worker if
//! the parent dies.

use super::worker::{WORKER_SUBCOMMAND, WorkerRequest, WorkerResponse};
use analyst_application::{SandboxError, SandboxPort};
use analyst_domain::{SandboxJob, SandboxLimits, SandboxOutcome};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default allowance for process start-up and VM setup
const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    program: PathBuf,
    limits: SandboxLimits,
    startup_grace: Duration,
}

impl ProcessSandbox {
    /// Use `program` (an `analyst` binary) as the worker.
    pub fn new(program: impl Into<PathBuf>, limits: SandboxLimits) -> Self {
        Self {
            program: program.into(),
            limits,
            startup_grace: DEFAULT_STARTUP_GRACE,
        }
    }

    /// Use the running executable as the worker.
    pub fn current_exe(limits: SandboxLimits) -> Result<Self, SandboxError> {
        let program = std::env::current_exe()
            .map_err(|e| SandboxError::Spawn(format!("cannot locate current executable: {}", e)))?;
        Ok(Self::new(program, limits))
    }

    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, time_limit: Duration) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(WORKER_SUBCOMMAND)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Linux: die with the parent, and let the kernel stop a worker that
        // burns CPU past the budget even if the parent is stuck.
        #[cfg(target_os = "linux")]
        {
            let cpu_secs = (time_limit + self.startup_grace).as_secs() as libc::rlim_t + 1;
            unsafe {
                cmd.pre_exec(move || {
                    libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
                    let limit = libc::rlimit {
                        rlim_cur: cpu_secs,
                        rlim_max: cpu_secs + 1,
                    };
                    libc::setrlimit(libc::RLIMIT_CPU, &limit);
                    Ok(())
                });
            }
        }
        #[cfg(not(target_os = "linux"))]
        let _ = time_limit;

        cmd
    }
}

#[async_trait]
impl SandboxPort for ProcessSandbox {
    async fn run(&self, job: SandboxJob) -> Result<SandboxOutcome, SandboxError> {
        let time_limit = job.time_limit;
        let limit_ms = job.time_limit_ms();
        let request = serde_json::to_vec(&WorkerRequest {
            job,
            limits: self.limits,
        })
        .map_err(|e| SandboxError::Protocol(format!("cannot encode job: {}", e)))?;

        let started = Instant::now();
        let mut child = self.command(time_limit).spawn().map_err(|e| {
            SandboxError::Spawn(format!("{}: {}", self.program.display(), e))
        })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::Spawn("worker stdin not captured".to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Spawn("worker stdout not captured".to_string()))?;

        let exchange = async move {
            stdin.write_all(&request).await?;
            drop(stdin);
            let mut output = Vec::new();
            stdout.read_to_end(&mut output).await?;
            Ok::<_, std::io::Error>(output)
        };

        let output = match tokio::time::timeout(time_limit + self.startup_grace, exchange).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(SandboxError::Protocol(format!("worker pipe failed: {}", e)));
            }
            Err(_) => {
                warn!(limit_ms, "Sandbox worker exceeded its deadline; killing");
                let _ = child.kill().await;
                return Ok(SandboxOutcome::timeout(limit_ms, Vec::new()));
            }
        };

        let status = child
            .wait()
            .await
            .map_err(|e| SandboxError::Protocol(format!("cannot reap worker: {}", e)))?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            %status,
            "Sandbox worker exited"
        );

        if output.iter().all(u8::is_ascii_whitespace) {
            // Killed by the CPU limit, or crashed before answering
            if started.elapsed() >= time_limit {
                return Ok(SandboxOutcome::timeout(limit_ms, Vec::new()));
            }
            return Err(SandboxError::Protocol(format!(
                "worker exited with {} without an outcome",
                status
            )));
        }

        let response: WorkerResponse = serde_json::from_slice(&output)
            .map_err(|e| SandboxError::Protocol(format!("malformed worker response: {}", e)))?;
        response.into_outcome()
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_worker_binary_is_spawn_error() {
        let sandbox = ProcessSandbox::new(
            "/nonexistent/analyst-worker",
            SandboxLimits::default(),
        );
        let err = sandbox
            .run(SandboxJob::new("set_result(1)", json!([]), Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Spawn(_)));
    }

    #[test]
    fn test_grace_builder() {
        let sandbox = ProcessSandbox::new("analyst", SandboxLimits::default())
            .with_startup_grace(Duration::from_secs(2));
        assert_eq!(sandbox.startup_grace, Duration::from_secs(2));
        assert_eq!(sandbox.program(), Path::new("analyst"));
    }
}
