//! Prompt domain
//!
//! Templates for the planner, code generation and report generation prompts.

mod analysis;

pub use analysis::{AnalysisPromptTemplate, RetryContext};
