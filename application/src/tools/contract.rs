//! Tool contract layer.
//!
//! Every call passes through the same fixed pipeline:
//!
//! 1. `validate`: schema check of the model-supplied arguments
//! 2. merge: system arguments overwrite validated ones on key collision
//! 3. dispatch: the registered handler runs with `&mut SessionState`
//! 4. normalize: panics, internal errors and malformed payloads become
//!    classified [`ToolError`]s
//!
//! No handler observes unvalidated input and no caller observes anything
//! but a well-formed [`ToolResult`].

use super::handler::{HandlerError, HandlerOutput};
use super::registry::ToolRegistry;
use analyst_domain::{
    SessionContext, SessionState, ToolArguments, ToolDefinition, ToolError, ToolResult,
    ToolValidator, ValidatedArguments, ValidationError,
};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ToolContract {
    registry: Arc<ToolRegistry>,
}

impl ToolContract {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Check model-supplied arguments against the tool's schema.
    pub fn validate(
        &self,
        tool_name: &str,
        arguments: &ToolArguments,
    ) -> Result<ValidatedArguments, ValidationError> {
        let definition = self
            .registry
            .definition(tool_name)
            .ok_or_else(|| ValidationError::UnknownTool(tool_name.to_string()))?;
        self.registry.validator().validate(definition, arguments)
    }

    /// Merge, dispatch and normalize one call.
    ///
    /// Never fails: every outcome, including a handler panic, is returned
    /// as a [`ToolResult`].
    pub async fn invoke(
        &self,
        tool_name: &str,
        validated: ValidatedArguments,
        system_arguments: ToolArguments,
        context: &SessionContext,
        state: &mut SessionState,
    ) -> ToolResult {
        let started = Instant::now();

        let mut final_arguments = validated.into_inner();
        for (key, value) in system_arguments {
            final_arguments.insert(key, value);
        }

        let arg_keys: Vec<&str> = final_arguments.keys().map(String::as_str).collect();
        info!(
            tool = tool_name,
            session_id = %context.session_id,
            user_id = %context.user_id,
            arg_keys = ?arg_keys,
            "Invoking tool"
        );

        let result = match (
            self.registry.definition(tool_name),
            self.registry.handler(tool_name),
        ) {
            (Some(definition), Some(handler)) => {
                let outcome = AssertUnwindSafe(handler.handle(&final_arguments, context, state))
                    .catch_unwind()
                    .await;
                normalize(definition, outcome)
            }
            _ => ToolResult::failure(
                tool_name,
                ToolError::tool_execution_error(format!(
                    "No handler registered for '{}'",
                    tool_name
                )),
            ),
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = result.with_duration(duration_ms);
        let result = if result.is_success() {
            result
        } else {
            result.with_final_arguments(final_arguments)
        };

        log_outcome(context, &result, duration_ms);
        result
    }

    /// `validate` then `invoke`, with validation failures wrapped as
    /// `INVALID_ARGUMENT` results.
    pub async fn call(
        &self,
        tool_name: &str,
        arguments: &ToolArguments,
        system_arguments: ToolArguments,
        context: &SessionContext,
        state: &mut SessionState,
    ) -> ToolResult {
        match self.validate(tool_name, arguments) {
            Ok(validated) => {
                self.invoke(tool_name, validated, system_arguments, context, state)
                    .await
            }
            Err(e) => invalid_argument_result(tool_name, &e, arguments),
        }
    }
}

/// Envelope for a rejected argument set.
pub fn invalid_argument_result(
    tool_name: &str,
    error: &ValidationError,
    arguments: &ToolArguments,
) -> ToolResult {
    warn!(tool = tool_name, "Argument validation failed: {}", error);
    ToolResult::failure(tool_name, ToolError::invalid_argument(error.to_string()))
        .with_final_arguments(arguments.clone())
}

fn normalize(
    definition: &ToolDefinition,
    outcome: Result<Result<HandlerOutput, HandlerError>, Box<dyn Any + Send>>,
) -> ToolResult {
    let name = definition.name.as_str();
    match outcome {
        Err(panic) => ToolResult::failure(
            name,
            ToolError::tool_execution_error(format!(
                "Handler panicked: {}",
                panic_message(panic.as_ref())
            )),
        ),
        Ok(Err(HandlerError::Tool { error, logs })) => {
            ToolResult::failure(name, error).with_logs(logs)
        }
        Ok(Err(HandlerError::Internal(message))) => {
            ToolResult::failure(name, ToolError::tool_execution_error(message))
        }
        Ok(Ok(HandlerOutput { payload, logs })) => match payload {
            Value::Object(map) => {
                let missing: Vec<&str> = definition
                    .result_fields
                    .iter()
                    .map(String::as_str)
                    .filter(|field| !map.contains_key(*field))
                    .collect();
                if missing.is_empty() {
                    ToolResult::success(name, map).with_logs(logs)
                } else {
                    ToolResult::failure(
                        name,
                        ToolError::invalid_tool_result(format!(
                            "Result is missing declared fields: {}",
                            missing.join(", ")
                        )),
                    )
                    .with_logs(logs)
                }
            }
            other => ToolResult::failure(
                name,
                ToolError::invalid_tool_result(format!(
                    "Result must be an object, got {}",
                    json_type(&other)
                )),
            )
            .with_logs(logs),
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn log_outcome(context: &SessionContext, result: &ToolResult, duration_ms: u64) {
    match result.error() {
        None => info!(
            tool = %result.tool_name,
            session_id = %context.session_id,
            status = "success",
            duration_ms,
            "Tool completed"
        ),
        Some(e) if e.kind.is_defect() => error!(
            tool = %result.tool_name,
            session_id = %context.session_id,
            status = "error",
            error_kind = %e.kind,
            duration_ms,
            "Tool defect: {}",
            e.message
        ),
        Some(e) => info!(
            tool = %result.tool_name,
            session_id = %context.session_id,
            status = "error",
            error_kind = %e.kind,
            duration_ms,
            "Tool failed: {}",
            e.message
        ),
    }
}
