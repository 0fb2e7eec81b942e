//! Tool registry and capability catalog.
//!
//! Built once from a static list of `(definition, handler)` pairs and
//! immutable afterwards. The registry holds no per-call state.

use super::handler::ToolHandler;
use analyst_domain::{CatalogEntry, DomainError, SchemaValidator, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable mapping from tool name to definition and handler.
pub struct ToolRegistry {
    /// Sorted by name
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    validator: SchemaValidator,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions
            .binary_search_by(|d| d.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.definitions[i])
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// All definitions, sorted by name
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Descriptive catalog for the planning layer, sorted by name.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.definitions
            .iter()
            .map(|d| CatalogEntry {
                name: d.name.clone(),
                description: d.description.clone(),
                output_description: d.result_description.clone(),
            })
            .collect()
    }

    /// Catalog rendered as text for planner prompts.
    pub fn catalog_text(&self) -> String {
        let mut out = String::from("Available tools:\n");
        for d in &self.definitions {
            out.push_str(&format!("\n## {}\n{}\n", d.name, d.description));
            if !d.parameters.is_empty() {
                out.push_str("Arguments:\n");
                for p in &d.parameters {
                    let required = if p.required { "required" } else { "optional" };
                    out.push_str(&format!(
                        "- {} ({}, {}): {}\n",
                        p.name, p.param_type, required, p.description
                    ));
                }
            }
            out.push_str(&format!("Returns: {}\n", d.result_description));
        }
        out
    }
}

/// Collects registrations, then checks them as a whole.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<(ToolDefinition, Arc<dyn ToolHandler>)>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        self.tools.push((definition, handler));
        self
    }

    /// Rejects duplicate names and uncompilable argument patterns.
    pub fn build(self) -> Result<ToolRegistry, DomainError> {
        let mut definitions = Vec::with_capacity(self.tools.len());
        let mut handlers = HashMap::with_capacity(self.tools.len());

        for (definition, handler) in self.tools {
            if handlers.contains_key(&definition.name) {
                return Err(DomainError::DuplicateTool(definition.name));
            }
            for key in &definition.system_arguments {
                if definition
                    .parameter(key)
                    .is_some_and(|p| p.required)
                {
                    return Err(DomainError::InvalidSchema(format!(
                        "{}: system argument '{}' cannot be a required parameter",
                        definition.name, key
                    )));
                }
            }
            handlers.insert(definition.name.clone(), handler);
            definitions.push(definition);
        }

        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        let validator = SchemaValidator::compile(&definitions)?;

        Ok(ToolRegistry {
            definitions,
            handlers,
            validator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::handler::{HandlerError, HandlerOutput};
    use analyst_domain::{SessionContext, SessionState, ToolArguments, ToolParameter};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn handle(
            &self,
            _arguments: &ToolArguments,
            _context: &SessionContext,
            _state: &mut SessionState,
        ) -> Result<HandlerOutput, HandlerError> {
            Ok(HandlerOutput::new(json!({})))
        }
    }

    fn def(name: &str) -> ToolDefinition {
        ToolDefinition::new(name, format!("{} tool", name))
            .with_result("Nothing", std::iter::empty())
    }

    #[test]
    fn test_catalog_sorted_by_name() {
        let registry = ToolRegistry::builder()
            .register(def("zeta"), Arc::new(Echo))
            .register(def("alpha"), Arc::new(Echo))
            .build()
            .unwrap();

        let names: Vec<String> = registry.catalog().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(registry.definition("zeta").is_some());
        assert!(registry.definition("missing").is_none());
        assert!(registry.has_tool("alpha"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = ToolRegistry::builder()
            .register(def("a"), Arc::new(Echo))
            .register(def("a"), Arc::new(Echo))
            .build()
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateTool("a".into()));
    }

    #[test]
    fn test_required_system_argument_rejected() {
        let bad = def("x")
            .with_parameter(ToolParameter::new("code", "Code", true))
            .with_system_argument("code");
        assert!(ToolRegistry::builder().register(bad, Arc::new(Echo)).build().is_err());
    }

    #[test]
    fn test_catalog_text_lists_arguments() {
        let registry = ToolRegistry::builder()
            .register(
                def("parse").with_parameter(ToolParameter::new("dataset_id", "Dataset", true)),
                Arc::new(Echo),
            )
            .build()
            .unwrap();
        let text = registry.catalog_text();
        assert!(text.contains("## parse"));
        assert!(text.contains("- dataset_id (string, required): Dataset"));
        assert!(text.contains("Returns: Nothing"));
    }

    #[test]
    fn test_catalog_entry_wire_shape() {
        let registry = ToolRegistry::builder()
            .register(def("a"), Arc::new(Echo))
            .build()
            .unwrap();
        let value = serde_json::to_value(&registry.catalog()[0]).unwrap();
        assert_eq!(
            value,
            json!({"name": "a", "description": "a tool", "outputDescription": "Nothing"})
        );
    }
}
