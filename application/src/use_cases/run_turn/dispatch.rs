//! Single-call dispatch: validate, check prerequisites, substitute system
//! arguments, invoke, then apply the turn transition.

use super::TurnOrchestrator;
use super::types::RunTurnError;
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::generation::PreviousAttempt;
use crate::tools::contract::invalid_argument_result;
use crate::tools::{keys, names};
use analyst_domain::{
    AnalysisSession, DatasetId, ErrorKind, Prerequisite, SessionState, ToolArguments, ToolCall,
    ToolDefinition, ToolError, ToolResult, Turn, TurnEffect, TurnFailure,
};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

/// Tool that produces a prerequisite, for the hint in the error message.
fn producer(prerequisite: Prerequisite) -> &'static str {
    match prerequisite {
        Prerequisite::ParsedData => names::PARSE_DATASET,
        Prerequisite::GeneratedCode => names::GENERATE_ANALYSIS_CODE,
        Prerequisite::ExecutionResult => names::EXECUTE_ANALYSIS_CODE,
    }
}

fn dataset_of(arguments: &ToolArguments) -> Option<DatasetId> {
    arguments
        .get(keys::DATASET_ID)
        .and_then(Value::as_str)
        .and_then(|s| DatasetId::parse(s).ok())
}

fn payload_str<'a>(result: &'a ToolResult, key: &str) -> &'a str {
    result
        .payload()
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// Failing code and its classification for a regeneration request.
fn previous_attempt(state: &SessionState, id: &DatasetId, note: &str) -> Option<PreviousAttempt> {
    let failed = state
        .last_execution()
        .filter(|record| &record.dataset_id == id)
        .and_then(|record| record.error.as_ref().map(|error| (record, error)));

    match failed {
        Some((record, error)) => Some(PreviousAttempt {
            code: record.code.clone(),
            error_kind: Some(error.kind),
            error_message: match &error.details {
                Some(details) => format!("{}\n{}", error.message, details),
                None => error.message.clone(),
            },
            planner_note: Some(note.to_string()),
        }),
        None => state.code_for(id).map(|generated| PreviousAttempt {
            code: generated.code.clone(),
            error_kind: None,
            error_message: note.to_string(),
            planner_note: Some(note.to_string()),
        }),
    }
}

/// Values the orchestrator supplies itself for the definition's system keys.
pub(super) fn system_arguments(
    definition: &ToolDefinition,
    arguments: &ToolArguments,
    state: &SessionState,
) -> ToolArguments {
    let mut system = ToolArguments::new();
    let Some(id) = dataset_of(arguments) else {
        return system;
    };

    for key in &definition.system_arguments {
        match key.as_str() {
            keys::CODE => {
                if let Some(generated) = state.code_for(&id) {
                    system.insert(keys::CODE.to_string(), Value::String(generated.code.clone()));
                }
            }
            keys::PREVIOUS_ATTEMPT => {
                let note = arguments.get(keys::PREVIOUS_ERROR).and_then(Value::as_str);
                if let Some(attempt) = note.and_then(|note| previous_attempt(state, &id, note))
                    && let Ok(value) = serde_json::to_value(attempt)
                {
                    system.insert(keys::PREVIOUS_ATTEMPT.to_string(), value);
                }
            }
            keys::ANALYSIS_RESULT => {
                if let Some(result) = state
                    .successful_execution_for(&id)
                    .and_then(|record| record.result.clone())
                {
                    system.insert(keys::ANALYSIS_RESULT.to_string(), result);
                }
            }
            other => debug!("No system value for argument '{}'", other),
        }
    }
    system
}

impl TurnOrchestrator {
    /// Dispatch one tool call within an in-progress turn.
    ///
    /// Validation and prerequisite failures come back as error envelopes and
    /// leave the turn running; only misuse of a closed turn is an `Err`.
    pub async fn dispatch(
        &self,
        session: &mut AnalysisSession,
        turn: &mut Turn,
        call: ToolCall,
    ) -> Result<ToolResult, RunTurnError> {
        if !turn.is_in_progress() {
            return Err(RunTurnError::TurnClosed {
                turn: turn.number,
                state: turn.state.as_str(),
            });
        }

        let step = turn.steps() + 1;
        self.progress
            .on_tool_call(&call.tool_name, &call.argument_keys());
        self.logger.log(ConversationEvent::new(
            "tool_call",
            json!({
                "session_id": session.context.session_id,
                "turn": turn.number,
                "step": step,
                "tool": call.tool_name,
                "arguments": call.arguments,
            }),
        ));

        let result = self.execute_call(session, &call).await;

        self.progress.on_tool_result(&call.tool_name, &result);
        self.logger.log(ConversationEvent::new(
            "tool_result",
            json!({
                "session_id": session.context.session_id,
                "turn": turn.number,
                "step": step,
                "tool": call.tool_name,
                "response": result.to_response(),
                "duration_ms": result.metadata.duration_ms,
            }),
        ));

        turn.record(call, result.clone());
        self.apply_transition(session, turn, &result)?;
        Ok(result)
    }

    async fn execute_call(&self, session: &mut AnalysisSession, call: &ToolCall) -> ToolResult {
        let name = call.tool_name.as_str();
        let validated = match self.contract.validate(name, &call.arguments) {
            Ok(validated) => validated,
            Err(e) => return invalid_argument_result(name, &e, &call.arguments),
        };
        let Some(definition) = self.contract.registry().definition(name) else {
            return ToolResult::failure(
                name,
                ToolError::tool_execution_error(format!("No definition for '{}'", name)),
            );
        };

        if !definition.prerequisites.is_empty() {
            let Some(id) = dataset_of(validated.as_map()) else {
                return ToolResult::failure(
                    name,
                    ToolError::invalid_argument(format!("{} requires a valid dataset_id", name)),
                )
                .with_final_arguments(validated.into_inner());
            };
            if let Some(missing) = session
                .state
                .missing_prerequisite(&definition.prerequisites, &id)
            {
                warn!(
                    tool = name,
                    dataset = %id,
                    missing = %missing,
                    "Prerequisite missing, handler not invoked"
                );
                return ToolResult::failure(
                    name,
                    ToolError::prerequisite_missing(format!(
                        "{} needs {} for dataset '{}'; call {} first",
                        name,
                        missing,
                        id,
                        producer(missing)
                    )),
                )
                .with_final_arguments(validated.into_inner());
            }
        }

        let system = system_arguments(definition, validated.as_map(), &session.state);
        self.contract
            .invoke(name, validated, system, &session.context, &mut session.state)
            .await
    }

    fn apply_transition(
        &self,
        session: &AnalysisSession,
        turn: &mut Turn,
        result: &ToolResult,
    ) -> Result<(), RunTurnError> {
        match result.error() {
            None => {
                if result.tool_name == names::EXECUTE_ANALYSIS_CODE {
                    turn.execution_failures = 0;
                }
                let effect = self
                    .contract
                    .registry()
                    .definition(&result.tool_name)
                    .map(|d| d.turn_effect)
                    .unwrap_or_default();
                match effect {
                    TurnEffect::Continue => return Ok(()),
                    TurnEffect::PauseForClarification => {
                        turn.pause(payload_str(result, keys::QUESTION))?
                    }
                    TurnEffect::Answer => turn.answer(
                        payload_str(result, keys::ANSWER),
                        session.state.artifacts_of_turn(turn.number),
                    )?,
                }
            }
            Some(e) => match e.kind {
                ErrorKind::InvalidArgument | ErrorKind::PrerequisiteMissing => {
                    debug!(tool = %result.tool_name, "Recoverable error returned to planner");
                    return Ok(());
                }
                ErrorKind::GenerationFailed => {
                    turn.fail(TurnFailure::GenerationUnavailable {
                        tool: result.tool_name.clone(),
                        error: e.clone(),
                    })?;
                }
                ErrorKind::ExecutionTimeout
                | ErrorKind::ExecutionNoResult
                | ErrorKind::ExecutionFailure => {
                    turn.execution_failures += 1;
                    let max = self.params.max_regenerations;
                    if turn.execution_failures > max {
                        turn.fail(TurnFailure::RegenerationLimit {
                            attempts: turn.execution_failures,
                            error: e.clone(),
                        })?;
                    } else {
                        self.progress
                            .on_regeneration(turn.execution_failures, max, &e.message);
                        return Ok(());
                    }
                }
                ErrorKind::InvalidToolResult | ErrorKind::ToolExecutionError => {
                    error!(
                        tool = %result.tool_name,
                        error_kind = %e.kind,
                        "Tool defect, failing turn: {}",
                        e.message
                    );
                    turn.fail(TurnFailure::ToolDefect {
                        tool: result.tool_name.clone(),
                        error: e.clone(),
                    })?;
                }
            },
        }

        self.emit_state(session, turn);
        Ok(())
    }
}
