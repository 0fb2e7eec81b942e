//! Sandbox domain module
//!
//! Pure description of one sandboxed run: the [`SandboxJob`] going in, the
//! [`SandboxOutcome`] coming out, and the log bound applied in between.
//! The execution engines themselves live in the infrastructure layer.

pub mod entities;
pub mod log_buffer;

pub use entities::{SandboxFailure, SandboxJob, SandboxLimits, SandboxOutcome};
pub use log_buffer::LogBuffer;
