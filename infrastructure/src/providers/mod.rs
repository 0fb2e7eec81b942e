//! Model-backed and scripted collaborators

pub mod openai;
pub mod scripted;
pub mod unconfigured;

pub use openai::{OpenAiCompatibleClient, OpenAiError};
pub use scripted::{ScriptError, ScriptedPlanner};
pub use unconfigured::UnconfiguredGenerator;
