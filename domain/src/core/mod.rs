//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`string::truncate`]: character-bounded excerpts for prompts and messages

pub mod error;
pub mod string;
