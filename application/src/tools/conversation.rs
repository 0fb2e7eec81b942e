//! Conversation tools: `ask_for_clarification` and `final_answer`.
//!
//! Both only echo their argument; the orchestrator applies the turn
//! transition declared on the definition.

use super::handler::{HandlerError, HandlerOutput, ToolHandler, required_str};
use super::{keys, names};
use analyst_domain::{
    SessionContext, SessionState, ToolArguments, ToolDefinition, ToolParameter, TurnEffect,
};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub fn ask_for_clarification_definition() -> ToolDefinition {
    ToolDefinition::new(
        names::ASK_FOR_CLARIFICATION,
        "Ask the user a question when the request is ambiguous. Ends the turn until the user replies.",
    )
    .with_parameter(
        ToolParameter::new(keys::QUESTION, "The question to show the user", true)
            .with_max_length(2000),
    )
    .with_turn_effect(TurnEffect::PauseForClarification)
    .with_result("The question as shown to the user", ["question"])
}

pub fn final_answer_definition() -> ToolDefinition {
    ToolDefinition::new(
        names::FINAL_ANSWER,
        "Give the final answer to the user's request. Ends the turn.",
    )
    .with_parameter(
        ToolParameter::new(keys::ANSWER, "The answer text", true).with_max_length(20_000),
    )
    .with_turn_effect(TurnEffect::Answer)
    .with_result("The answer as shown to the user", ["answer"])
}

/// Echoes one required string argument back under the same key.
pub struct EchoHandler {
    key: &'static str,
}

impl EchoHandler {
    pub fn question() -> Self {
        Self {
            key: keys::QUESTION,
        }
    }

    pub fn answer() -> Self {
        Self { key: keys::ANSWER }
    }
}

#[async_trait]
impl ToolHandler for EchoHandler {
    async fn handle(
        &self,
        arguments: &ToolArguments,
        _context: &SessionContext,
        _state: &mut SessionState,
    ) -> Result<HandlerOutput, HandlerError> {
        let text = required_str(arguments, self.key)?;
        let mut payload = Map::new();
        payload.insert(self.key.to_string(), Value::String(text.to_string()));
        Ok(HandlerOutput::new(Value::Object(payload)))
    }
}
