//! Application-level configuration.
//!
//! - [`ExecutionParams`]: turn loop control (step budget, regeneration bound, collaborator timeouts)
//! - [`CollaboratorPolicy`]: timeout and attempt count applied to every collaborator call

pub mod execution_params;

pub use execution_params::{CollaboratorPolicy, ExecutionParams};
