//! Sandboxed execution of analysis code.
//!
//! [`LuaRuntime`] runs one job in a fresh Lua 5.4 VM. [`ProcessSandbox`]
//! is the only [`SandboxPort`]: each job gets its own `sandbox-worker`
//! process, which is killed at the deadline. The deadline hook alone cannot
//! interrupt a single long native call such as a backtracking pattern match.
//!
//! [`SandboxPort`]: analyst_application::SandboxPort

mod capabilities;
mod process;
mod runtime;
mod worker;

pub use capabilities::REMOVED_GLOBALS;
pub use process::ProcessSandbox;
pub use runtime::LuaRuntime;
pub use worker::{WORKER_SUBCOMMAND, WorkerRequest, WorkerResponse, run_worker};
