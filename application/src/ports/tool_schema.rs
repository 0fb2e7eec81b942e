//! Tool schema conversion port.
//!
//! Separates "which tools exist" (the registry) from "how to serialize them
//! for a model API" (infrastructure). System-only arguments are never part
//! of the converted schema.

use analyst_domain::ToolDefinition;

/// Port for converting tool definitions to LLM API format (JSON Schema).
pub trait ToolSchemaPort: Send + Sync {
    /// Convert a single tool definition to provider-neutral JSON Schema.
    fn tool_to_schema(&self, tool: &ToolDefinition) -> serde_json::Value;

    /// Convert all tools to a JSON Schema array, keeping the input order.
    fn all_tools_schema(&self, tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        tools.iter().map(|tool| self.tool_to_schema(tool)).collect()
    }
}
