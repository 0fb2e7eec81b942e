//! JSON Schema tool converter.
//!
//! Default implementation of [`ToolSchemaPort`] that produces provider-neutral
//! JSON Schema for native tool use.

use analyst_application::ToolSchemaPort;
use analyst_domain::ToolDefinition;
use serde_json::{Map, Value, json};

/// Default implementation producing provider-neutral JSON Schema.
///
/// Parameter constraints carry over as JSON Schema keywords: `pattern`
/// becomes an anchored `pattern`, allowed values become `enum` and the
/// length limit becomes `maxLength`. Keys the orchestrator substitutes are
/// left out so the model never tries to supply them.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaToolConverter;

impl ToolSchemaPort for JsonSchemaToolConverter {
    fn tool_to_schema(&self, tool: &ToolDefinition) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &tool.parameters {
            if tool.system_arguments.iter().any(|key| key == &param.name) {
                continue;
            }

            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.param_type.as_str()));
            prop.insert("description".to_string(), json!(param.description));
            if let Some(pattern) = &param.pattern {
                prop.insert("pattern".to_string(), json!(format!("^(?:{})$", pattern)));
            }
            if !param.allowed_values.is_empty() {
                prop.insert("enum".to_string(), json!(param.allowed_values));
            }
            if let Some(max) = param.max_length {
                prop.insert("maxLength".to_string(), json!(max));
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }
        })
    }
}
