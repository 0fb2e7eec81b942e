//! OpenAI-compatible chat completions client
//!
//! One HTTP client serves all three model-backed collaborators: the planner
//! (native tool calls), code generation and report generation.

use analyst_application::{
    CodeGenerationPort, CodeRequest, GenerationError, PlannerError, PlannerPort, PlannerView,
    ReportGenerationPort, ReportRequest, ToolSchemaPort,
};
use analyst_domain::{AnalysisPromptTemplate, HistoryEntry, RetryContext, ToolCall};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::tools::JsonSchemaToolConverter;

/// Errors talking to a chat completions endpoint
#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response had no content")]
    Empty,
}

impl OpenAiError {
    /// Connection problems, rate limits and server errors are worth retrying
    fn is_transient(&self) -> bool {
        match self {
            OpenAiError::Http(_) => true,
            OpenAiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<OpenAiError> for GenerationError {
    fn from(err: OpenAiError) -> Self {
        match err {
            OpenAiError::Empty => GenerationError::EmptyOutput,
            e if e.is_transient() => GenerationError::Unavailable(e.to_string()),
            e => GenerationError::Failed(e.to_string()),
        }
    }
}

impl From<OpenAiError> for PlannerError {
    fn from(err: OpenAiError) -> Self {
        match err {
            OpenAiError::Empty => PlannerError::NoToolCall("empty response".to_string()),
            e if e.is_transient() => PlannerError::Unavailable(e.to_string()),
            e => PlannerError::RequestFailed(e.to_string()),
        }
    }
}

/// Client for any endpoint speaking the `/chat/completions` protocol.
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    converter: Arc<dyn ToolSchemaPort>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OpenAiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenAiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            converter: Arc::new(JsonSchemaToolConverter),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn ToolSchemaPort>) -> Self {
        self.converter = converter;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, body: Value) -> Result<Value, OpenAiError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model {})", url, self.model);

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OpenAiError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OpenAiError::Parse(e.to_string()))
    }

    async fn complete_text(&self, system: &str, user: &str) -> Result<String, OpenAiError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let response = self.complete(body).await?;
        message_text(&response)
    }
}

/// Content of `choices[0].message`, trimmed; empty content is an error.
fn message_text(response: &Value) -> Result<String, OpenAiError> {
    let message = first_message(response)?;
    let text = message["content"].as_str().unwrap_or_default().trim();
    if text.is_empty() {
        return Err(OpenAiError::Empty);
    }
    Ok(text.to_string())
}

fn first_message(response: &Value) -> Result<&Value, OpenAiError> {
    response["choices"]
        .get(0)
        .map(|choice| &choice["message"])
        .ok_or_else(|| OpenAiError::Parse("No choices in response".to_string()))
}

/// Body of the first fenced code block, or the whole text when unfenced.
fn extract_code(text: &str) -> Result<String, GenerationError> {
    let fence = Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)```")
        .map_err(|e| GenerationError::Failed(e.to_string()))?;

    let code = match fence.captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => text.trim(),
    };

    if code.is_empty() {
        return Err(GenerationError::EmptyOutput);
    }
    Ok(code.to_string())
}

fn call_id(entry: &HistoryEntry) -> String {
    entry
        .call
        .native_id
        .clone()
        .unwrap_or_else(|| format!("call_{}", entry.step))
}

/// Chat transcript for the planner: the user message followed by every
/// dispatched call replayed as an assistant tool call and its tool result.
fn planner_messages(view: &PlannerView<'_>) -> Vec<Value> {
    let mut messages = vec![
        json!({"role": "system", "content": AnalysisPromptTemplate::planner_system()}),
        json!({
            "role": "user",
            "content": AnalysisPromptTemplate::planner_user(view.user_message, view.answers_clarification),
        }),
    ];

    for entry in view.history {
        let id = call_id(entry);
        let arguments = Value::Object(entry.call.arguments.clone()).to_string();
        messages.push(json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": [{
                "id": id,
                "type": "function",
                "function": {"name": entry.call.tool_name, "arguments": arguments},
            }],
        }));

        let content = serde_json::to_string(&entry.result.to_response())
            .unwrap_or_else(|e| json!({"status": "error", "error": e.to_string()}).to_string());
        messages.push(json!({"role": "tool", "tool_call_id": id, "content": content}));
    }

    messages.push(json!({
        "role": "system",
        "content": format!("You may make at most {} more tool calls in this turn.", view.remaining_steps),
    }));

    messages
}

/// Wrap converter output in the `{"type":"function"}` envelope.
fn function_tools(converter: &dyn ToolSchemaPort, view: &PlannerView<'_>) -> Vec<Value> {
    converter
        .all_tools_schema(view.tools)
        .into_iter()
        .map(|schema| {
            json!({
                "type": "function",
                "function": {
                    "name": schema["name"],
                    "description": schema["description"],
                    "parameters": schema["input_schema"],
                },
            })
        })
        .collect()
}

/// First tool call of the response as a [`ToolCall`].
fn parse_tool_call(response: &Value) -> Result<ToolCall, PlannerError> {
    let message = first_message(response)?;

    let Some(call) = message["tool_calls"].as_array().and_then(|calls| calls.first()) else {
        let text = message["content"].as_str().unwrap_or_default().trim();
        return Err(PlannerError::NoToolCall(if text.is_empty() {
            "empty response".to_string()
        } else {
            analyst_domain::truncate(text, 200)
        }));
    };

    let name = call["function"]["name"]
        .as_str()
        .ok_or_else(|| PlannerError::RequestFailed("tool call without a name".to_string()))?;

    let raw_arguments = call["function"]["arguments"].as_str().unwrap_or("{}");
    let arguments = match serde_json::from_str::<Value>(raw_arguments) {
        Ok(Value::Object(map)) => map,
        // Leave shape errors to argument validation
        Ok(other) => {
            let mut map = serde_json::Map::new();
            map.insert("_raw".to_string(), other);
            map
        }
        Err(e) => {
            return Err(PlannerError::RequestFailed(format!(
                "arguments for '{}' are not JSON: {}",
                name, e
            )));
        }
    };

    let mut tool_call = ToolCall::new(name);
    tool_call.arguments = arguments;
    if let Some(id) = call["id"].as_str() {
        tool_call = tool_call.with_native_id(id);
    }
    Ok(tool_call)
}

#[async_trait]
impl PlannerPort for OpenAiCompatibleClient {
    async fn next_action(&self, view: &PlannerView<'_>) -> Result<ToolCall, PlannerError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": planner_messages(view),
            "tools": function_tools(self.converter.as_ref(), view),
            "tool_choice": "required",
            "parallel_tool_calls": false,
        });

        let response = self.complete(body).await?;
        parse_tool_call(&response)
    }
}

#[async_trait]
impl CodeGenerationPort for OpenAiCompatibleClient {
    async fn generate_code(&self, request: &CodeRequest) -> Result<String, GenerationError> {
        let retry = request.previous_attempt.as_ref().map(|attempt| RetryContext {
            code: &attempt.code,
            error: &attempt.error_message,
            note: attempt.planner_note.as_deref(),
        });

        let prompt = AnalysisPromptTemplate::code_request(
            &request.goal,
            request.dataset_id.as_str(),
            &request.schema_context,
            retry,
        );

        let text = self
            .complete_text(AnalysisPromptTemplate::code_system(), &prompt)
            .await?;
        extract_code(&text)
    }
}

#[async_trait]
impl ReportGenerationPort for OpenAiCompatibleClient {
    async fn generate_report(&self, request: &ReportRequest) -> Result<String, GenerationError> {
        let prompt = AnalysisPromptTemplate::report_request(
            request.dataset_id.as_str(),
            request.focus.as_deref(),
            &request.result_summary,
        );

        Ok(self
            .complete_text(AnalysisPromptTemplate::report_system(), &prompt)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_domain::{ToolDefinition, ToolParameter, ToolResult};

    #[test]
    fn test_extract_code_from_fence() {
        let text = "Here you go:\n```lua\nlocal n = #data\nset_result(n)\n```\nDone.";
        assert_eq!(extract_code(text).unwrap(), "local n = #data\nset_result(n)");
    }

    #[test]
    fn test_extract_code_unfenced() {
        assert_eq!(extract_code("  set_result(1)\n").unwrap(), "set_result(1)");
    }

    #[test]
    fn test_extract_code_empty_fence() {
        assert_eq!(
            extract_code("```lua\n\n```").unwrap_err(),
            GenerationError::EmptyOutput
        );
    }

    #[test]
    fn test_parse_tool_call() {
        let response = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "parse_dataset", "arguments": "{\"dataset_id\":\"sales\"}"}
                    }]
                }
            }]
        });
        let call = parse_tool_call(&response).unwrap();
        assert_eq!(call.tool_name, "parse_dataset");
        assert_eq!(call.get_string("dataset_id"), Some("sales"));
        assert_eq!(call.native_id.as_deref(), Some("call_abc"));
    }

    #[test]
    fn test_parse_content_only_is_no_tool_call() {
        let response = json!({"choices": [{"message": {"content": "I think the answer is 4"}}]});
        assert!(matches!(
            parse_tool_call(&response),
            Err(PlannerError::NoToolCall(text)) if text.contains("answer is 4")
        ));
    }

    #[test]
    fn test_parse_bad_arguments() {
        let response = json!({
            "choices": [{"message": {"tool_calls": [{
                "id": "x",
                "function": {"name": "final_answer", "arguments": "{not json"}
            }]}}]
        });
        assert!(matches!(
            parse_tool_call(&response),
            Err(PlannerError::RequestFailed(_))
        ));
    }

    #[test]
    fn test_planner_messages_replay_history() {
        let tools = vec![
            ToolDefinition::new("parse_dataset", "Load")
                .with_parameter(ToolParameter::new("dataset_id", "Dataset", true)),
        ];
        let call = ToolCall::new("parse_dataset").with_arg("dataset_id", "sales");
        let result = ToolResult::success("parse_dataset", serde_json::Map::new());
        let history = vec![HistoryEntry {
            step: 1,
            call,
            result,
        }];
        let view = PlannerView {
            user_message: "How many rows?",
            answers_clarification: None,
            tools: &tools,
            history: &history,
            remaining_steps: 4,
        };

        let messages = planner_messages(&view);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[1]["content"], "How many rows?");
        assert_eq!(messages[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            "{\"dataset_id\":\"sales\"}"
        );
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert!(messages[4]["content"].as_str().unwrap().contains("4 more"));

        let functions = function_tools(&JsonSchemaToolConverter, &view);
        assert_eq!(functions[0]["type"], "function");
        assert_eq!(functions[0]["function"]["name"], "parse_dataset");
        assert_eq!(functions[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_error_mapping() {
        let server = OpenAiError::Status {
            status: 503,
            body: "busy".into(),
        };
        assert!(matches!(GenerationError::from(server), GenerationError::Unavailable(_)));

        let auth = OpenAiError::Status {
            status: 401,
            body: "nope".into(),
        };
        assert!(matches!(PlannerError::from(auth), PlannerError::RequestFailed(_)));

        assert_eq!(GenerationError::from(OpenAiError::Empty), GenerationError::EmptyOutput);
    }
}
