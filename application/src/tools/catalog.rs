//! The static tool catalog.
//!
//! Each tool name is bound to its definition and handler explicitly here;
//! nothing is derived from naming conventions.

use super::conversation::{EchoHandler, ask_for_clarification_definition, final_answer_definition};
use super::dataset::{
    GetDatasetSchemaHandler, ParseDatasetHandler, get_dataset_schema_definition,
    parse_dataset_definition,
};
use super::execution::{ExecuteAnalysisCodeHandler, execute_analysis_code_definition};
use super::generation::{
    GenerateAnalysisCodeHandler, GenerateReportHandler, generate_analysis_code_definition,
    generate_report_definition,
};
use super::registry::ToolRegistry;
use crate::config::ExecutionParams;
use crate::ports::datasets::{DatasetContentPort, DatasetSchemaPort};
use crate::ports::generation::{CodeGenerationPort, ReportGenerationPort};
use crate::ports::sandbox::SandboxPort;
use analyst_domain::DomainError;
use std::sync::Arc;

/// Collaborators injected at session setup.
#[derive(Clone)]
pub struct StandardCollaborators {
    pub content: Arc<dyn DatasetContentPort>,
    pub schemas: Arc<dyn DatasetSchemaPort>,
    pub code_generator: Arc<dyn CodeGenerationPort>,
    pub report_generator: Arc<dyn ReportGenerationPort>,
    pub sandbox: Arc<dyn SandboxPort>,
}

/// Build the registry holding every tool the agent may call.
pub fn standard_registry(
    collaborators: StandardCollaborators,
    params: &ExecutionParams,
) -> Result<ToolRegistry, DomainError> {
    let policy = params.collaborator_policy();
    let StandardCollaborators {
        content,
        schemas,
        code_generator,
        report_generator,
        sandbox,
    } = collaborators;

    ToolRegistry::builder()
        .register(
            get_dataset_schema_definition(),
            Arc::new(GetDatasetSchemaHandler::new(schemas.clone(), policy)),
        )
        .register(
            parse_dataset_definition(),
            Arc::new(ParseDatasetHandler::new(content, policy)),
        )
        .register(
            generate_analysis_code_definition(),
            Arc::new(GenerateAnalysisCodeHandler::new(schemas, code_generator, policy)),
        )
        .register(
            execute_analysis_code_definition(),
            Arc::new(ExecuteAnalysisCodeHandler::new(sandbox, params.sandbox_time_limit)),
        )
        .register(
            generate_report_definition(),
            Arc::new(GenerateReportHandler::new(report_generator, policy)),
        )
        .register(ask_for_clarification_definition(), Arc::new(EchoHandler::question()))
        .register(final_answer_definition(), Arc::new(EchoHandler::answer()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::collaborators;
    use crate::tools::names;
    use analyst_domain::Prerequisite;

    #[test]
    fn test_standard_catalog() {
        let registry = standard_registry(collaborators(), &ExecutionParams::default()).unwrap();
        let tool_names: Vec<&str> = registry.names().collect();
        assert_eq!(
            tool_names,
            vec![
                names::ASK_FOR_CLARIFICATION,
                names::EXECUTE_ANALYSIS_CODE,
                names::FINAL_ANSWER,
                names::GENERATE_ANALYSIS_CODE,
                names::GENERATE_REPORT,
                names::GET_DATASET_SCHEMA,
                names::PARSE_DATASET,
            ]
        );
    }

    #[test]
    fn test_execute_declares_data_dependency() {
        let registry = standard_registry(collaborators(), &ExecutionParams::default()).unwrap();
        let execute = registry.definition(names::EXECUTE_ANALYSIS_CODE).unwrap();
        assert_eq!(
            execute.prerequisites,
            vec![Prerequisite::ParsedData, Prerequisite::GeneratedCode]
        );
        assert_eq!(execute.system_arguments, vec!["code"]);
    }

    #[test]
    fn test_catalog_entries_are_descriptive_only() {
        let registry = standard_registry(collaborators(), &ExecutionParams::default()).unwrap();
        for entry in registry.catalog() {
            assert!(!entry.description.is_empty(), "{}", entry.name);
            assert!(!entry.output_description.is_empty(), "{}", entry.name);
        }
    }
}
