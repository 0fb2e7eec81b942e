//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Argument mapping passed to a tool (a JSON object).
pub type ToolArguments = Map<String, Value>;

/// Structural type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Whether a JSON value conforms to this type.
    ///
    /// `Integer` only accepts integral numbers; `Number` accepts any number.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Structural type
    pub param_type: ParamType,
    /// Regex the whole string value must match (strings only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values (strings only, empty = unrestricted)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// Maximum length in characters (strings only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: ParamType::String,
            pattern: None,
            allowed_values: Vec::new(),
            max_length: None,
        }
    }

    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

/// Session artifact a tool needs before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prerequisite {
    /// Parsed rows for the `dataset_id` argument are loaded in the session
    ParsedData,
    /// Code has been generated for the `dataset_id` argument
    GeneratedCode,
    /// A successful execution result exists for the `dataset_id` argument
    ExecutionResult,
}

impl Prerequisite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prerequisite::ParsedData => "parsed_data",
            Prerequisite::GeneratedCode => "generated_code",
            Prerequisite::ExecutionResult => "execution_result",
        }
    }
}

impl std::fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a successful call does to the surrounding turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEffect {
    /// The turn keeps going
    #[default]
    Continue,
    /// The turn pauses until the user answers a question
    PauseForClarification,
    /// The turn ends with an answer
    Answer,
}

/// Immutable definition of a tool: identity, argument contract and result shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "parse_dataset")
    pub name: String,
    /// Description for the calling agent
    pub description: String,
    /// Argument schema (LLM-visible parameters)
    pub parameters: Vec<ToolParameter>,
    /// Description of the successful result payload
    pub result_description: String,
    /// Keys every successful payload must carry
    #[serde(default)]
    pub result_fields: Vec<String>,
    /// Argument keys the orchestrator may substitute
    #[serde(default)]
    pub system_arguments: Vec<String>,
    /// Session artifacts required before dispatch
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    /// Turn transition on success
    #[serde(default)]
    pub turn_effect: TurnEffect,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            result_description: String::new(),
            result_fields: Vec::new(),
            system_arguments: Vec::new(),
            prerequisites: Vec::new(),
            turn_effect: TurnEffect::Continue,
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_result(
        mut self,
        description: impl Into<String>,
        fields: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        self.result_description = description.into();
        self.result_fields = fields.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_system_argument(mut self, key: impl Into<String>) -> Self {
        self.system_arguments.push(key.into());
        self
    }

    pub fn with_prerequisite(mut self, prerequisite: Prerequisite) -> Self {
        self.prerequisites.push(prerequisite);
        self
    }

    pub fn with_turn_effect(mut self, effect: TurnEffect) -> Self {
        self.turn_effect = effect;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }
}

/// A request to run a tool, as produced by the calling agent.
///
/// Serializes to the transport envelope `{ "tool": ..., "arguments": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call
    #[serde(rename = "tool")]
    pub tool_name: String,
    /// Arguments supplied by the agent (untrusted)
    #[serde(default)]
    pub arguments: ToolArguments,
    /// Provider-side call id for native tool use, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_id: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: ToolArguments::new(),
            native_id: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_native_id(mut self, id: impl Into<String>) -> Self {
        self.native_id = Some(id.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Argument keys, for logging without leaking values
    pub fn argument_keys(&self) -> Vec<&str> {
        self.arguments.keys().map(String::as_str).collect()
    }
}
