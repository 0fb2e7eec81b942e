//! Tool domain traits
//!
//! Contains pure domain logic for argument validation. The async handler
//! and executor ports are defined in the application layer.

use super::entities::{ToolArguments, ToolDefinition};
use crate::core::error::DomainError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One schema violation, addressed by field path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field_path: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field_path, self.reason)
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Argument validation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {}", format_violations(.violations))]
    InvalidArguments {
        tool: String,
        violations: Vec<FieldViolation>,
    },
}

impl ValidationError {
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ValidationError::UnknownTool(_) => &[],
            ValidationError::InvalidArguments { violations, .. } => violations,
        }
    }
}

/// Arguments that passed schema validation.
///
/// Only a [`ToolValidator`] produces this type, so holding one proves the
/// arguments conform to the tool's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArguments(ToolArguments);

impl ValidatedArguments {
    pub fn as_map(&self) -> &ToolArguments {
        &self.0
    }

    pub fn into_inner(self) -> ToolArguments {
        self.0
    }
}

/// Validator for tool arguments
///
/// This is a pure domain trait that validates arguments against a tool
/// definition without any I/O operations.
pub trait ToolValidator: Send + Sync {
    /// Validate arguments against a definition, reporting every violation.
    fn validate(
        &self,
        definition: &ToolDefinition,
        arguments: &ToolArguments,
    ) -> Result<ValidatedArguments, ValidationError>;
}

/// Schema validator with patterns compiled once up front.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    /// `tool.param` → anchored pattern
    patterns: HashMap<String, Regex>,
}

impl SchemaValidator {
    /// Compile the patterns of every given definition.
    pub fn compile<'a>(
        definitions: impl IntoIterator<Item = &'a ToolDefinition>,
    ) -> Result<Self, DomainError> {
        let mut patterns = HashMap::new();
        for definition in definitions {
            for param in &definition.parameters {
                if let Some(pattern) = &param.pattern {
                    let anchored = format!("^(?:{})$", pattern);
                    let regex = Regex::new(&anchored).map_err(|e| {
                        DomainError::InvalidSchema(format!(
                            "{}.{}: bad pattern '{}': {}",
                            definition.name, param.name, pattern, e
                        ))
                    })?;
                    patterns.insert(pattern_key(&definition.name, &param.name), regex);
                }
            }
        }
        Ok(Self { patterns })
    }
}

fn pattern_key(tool: &str, param: &str) -> String {
    format!("{}.{}", tool, param)
}

impl ToolValidator for SchemaValidator {
    fn validate(
        &self,
        definition: &ToolDefinition,
        arguments: &ToolArguments,
    ) -> Result<ValidatedArguments, ValidationError> {
        let mut violations = Vec::new();

        for param in &definition.parameters {
            let Some(value) = arguments.get(&param.name) else {
                if param.required {
                    violations.push(FieldViolation::new(&param.name, "required field is missing"));
                }
                continue;
            };

            // An explicit null for an optional field counts as absent
            if value.is_null() && !param.required {
                continue;
            }

            if !param.param_type.accepts(value) {
                violations.push(FieldViolation::new(
                    &param.name,
                    format!("expected {}", param.param_type),
                ));
                continue;
            }

            let Some(text) = value.as_str() else {
                continue;
            };

            if let Some(max) = param.max_length
                && text.chars().count() > max
            {
                violations.push(FieldViolation::new(
                    &param.name,
                    format!("longer than {} characters", max),
                ));
            }

            if !param.allowed_values.is_empty() && !param.allowed_values.iter().any(|v| v == text)
            {
                violations.push(FieldViolation::new(
                    &param.name,
                    format!("must be one of: {}", param.allowed_values.join(", ")),
                ));
            }

            if param.pattern.is_some() {
                match self.patterns.get(&pattern_key(&definition.name, &param.name)) {
                    Some(regex) if regex.is_match(text) => {}
                    Some(_) => violations.push(FieldViolation::new(
                        &param.name,
                        "does not match the required format",
                    )),
                    None => violations.push(FieldViolation::new(
                        &param.name,
                        "pattern was not compiled for this tool",
                    )),
                }
            }
        }

        for key in arguments.keys() {
            if definition.parameter(key).is_none() {
                violations.push(FieldViolation::new(key, "unknown field"));
            }
        }

        if violations.is_empty() {
            Ok(ValidatedArguments(arguments.clone()))
        } else {
            violations.sort();
            Err(ValidationError::InvalidArguments {
                tool: definition.name.clone(),
                violations,
            })
        }
    }
}
