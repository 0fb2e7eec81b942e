//! Generation tools: `generate_analysis_code` and `generate_report`.

use super::dataset::{dataset_error, dataset_id_parameter, load_schema};
use super::handler::{
    HandlerError, HandlerOutput, ToolHandler, dataset_id, optional_str, required_str,
};
use super::{keys, names};
use crate::config::CollaboratorPolicy;
use crate::ports::datasets::{DatasetError, DatasetSchemaPort};
use crate::ports::generation::{
    CodeGenerationPort, CodeRequest, GenerationError, PreviousAttempt, ReportGenerationPort,
    ReportRequest,
};
use crate::use_cases::shared::with_retry;
use analyst_domain::{
    DatasetSchema, GeneratedCode, Prerequisite, SessionContext, SessionState, ToolArguments,
    ToolDefinition, ToolError, ToolParameter, truncate,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Characters of the rendered result handed to report generation.
const MAX_RESULT_SUMMARY: usize = 8000;

fn generation_error(error: GenerationError) -> HandlerError {
    ToolError::generation_failed(error.to_string()).into()
}

pub fn generate_analysis_code_definition() -> ToolDefinition {
    ToolDefinition::new(
        names::GENERATE_ANALYSIS_CODE,
        "Write Lua analysis code for a goal against a dataset. The code reads `data` and must call `set_result(value)` exactly once. \
         After a failed execution, call again with `previous_error` describing the failure to get a corrected version.",
    )
    .with_parameter(
        ToolParameter::new(keys::GOAL, "What the analysis should compute", true)
            .with_max_length(2000),
    )
    .with_parameter(dataset_id_parameter())
    .with_parameter(
        ToolParameter::new(
            keys::PREVIOUS_ERROR,
            "Description of why the previous code failed, when regenerating",
            false,
        )
        .with_max_length(4000),
    )
    .with_system_argument(keys::PREVIOUS_ATTEMPT)
    .with_result(
        "The generated source code, held by the session for execution",
        ["dataset_id", "code"],
    )
}

pub struct GenerateAnalysisCodeHandler {
    schemas: Arc<dyn DatasetSchemaPort>,
    generator: Arc<dyn CodeGenerationPort>,
    policy: CollaboratorPolicy,
}

impl GenerateAnalysisCodeHandler {
    pub fn new(
        schemas: Arc<dyn DatasetSchemaPort>,
        generator: Arc<dyn CodeGenerationPort>,
        policy: CollaboratorPolicy,
    ) -> Self {
        Self {
            schemas,
            generator,
            policy,
        }
    }
}

fn previous_attempt(arguments: &ToolArguments) -> Result<Option<PreviousAttempt>, HandlerError> {
    match arguments.get(keys::PREVIOUS_ATTEMPT) {
        Some(value) if !value.is_null() => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| HandlerError::Internal(format!("malformed previous_attempt: {}", e))),
        _ => Ok(optional_str(arguments, keys::PREVIOUS_ERROR).map(|note| PreviousAttempt {
            code: String::new(),
            error_kind: None,
            error_message: note.to_string(),
            planner_note: Some(note.to_string()),
        })),
    }
}

#[async_trait]
impl ToolHandler for GenerateAnalysisCodeHandler {
    async fn handle(
        &self,
        arguments: &ToolArguments,
        _context: &SessionContext,
        state: &mut SessionState,
    ) -> Result<HandlerOutput, HandlerError> {
        let id = dataset_id(arguments)?;
        let goal = required_str(arguments, keys::GOAL)?;

        let schema = match load_schema(self.schemas.as_ref(), self.policy, &id, state).await {
            Ok(schema) => schema,
            Err(DatasetError::NotFound(_)) if state.parsed_rows(&id).is_some() => {
                let inferred = DatasetSchema::infer(state.parsed_rows(&id).unwrap_or_default());
                state.store_schema(id.clone(), inferred.clone());
                inferred
            }
            Err(e) => return Err(dataset_error(e)),
        };

        let previous_attempt = previous_attempt(arguments)?;
        let regeneration = previous_attempt.is_some();
        let request = CodeRequest {
            goal: goal.to_string(),
            dataset_id: id.clone(),
            schema_context: schema.to_prompt_context(),
            previous_attempt,
        };

        let generator = self.generator.as_ref();
        let code = with_retry(self.policy, "generate_code", || generator.generate_code(&request))
            .await
            .map_err(generation_error)?;
        if code.trim().is_empty() {
            return Err(generation_error(GenerationError::EmptyOutput));
        }

        info!(
            dataset = %id,
            regeneration,
            code_len = code.len(),
            "Generated analysis code"
        );
        state.store_generated_code(GeneratedCode {
            dataset_id: id.clone(),
            goal: goal.to_string(),
            code: code.clone(),
        });

        Ok(HandlerOutput::new(json!({
            "dataset_id": id.as_str(),
            "code": code,
            "regeneration": regeneration,
        })))
    }
}

pub fn generate_report_definition() -> ToolDefinition {
    ToolDefinition::new(
        names::GENERATE_REPORT,
        "Write a short narrative report from the last successful analysis result for a dataset.",
    )
    .with_parameter(dataset_id_parameter())
    .with_parameter(
        ToolParameter::new(keys::FOCUS, "Aspect the report should emphasize", false)
            .with_max_length(1000),
    )
    .with_system_argument(keys::ANALYSIS_RESULT)
    .with_prerequisite(Prerequisite::ExecutionResult)
    .with_result("The report text", ["dataset_id", "report"])
}

pub struct GenerateReportHandler {
    reporter: Arc<dyn ReportGenerationPort>,
    policy: CollaboratorPolicy,
}

impl GenerateReportHandler {
    pub fn new(reporter: Arc<dyn ReportGenerationPort>, policy: CollaboratorPolicy) -> Self {
        Self { reporter, policy }
    }
}

#[async_trait]
impl ToolHandler for GenerateReportHandler {
    async fn handle(
        &self,
        arguments: &ToolArguments,
        _context: &SessionContext,
        state: &mut SessionState,
    ) -> Result<HandlerOutput, HandlerError> {
        let id = dataset_id(arguments)?;
        let result: Value = match arguments.get(keys::ANALYSIS_RESULT) {
            Some(value) if !value.is_null() => value.clone(),
            _ => state
                .successful_execution_for(&id)
                .and_then(|record| record.result.clone())
                .ok_or_else(|| {
                    ToolError::prerequisite_missing(format!(
                        "No successful analysis result for dataset '{}'",
                        id
                    ))
                })?,
        };

        let rendered = serde_json::to_string_pretty(&result)
            .map_err(|e| HandlerError::Internal(format!("cannot render result: {}", e)))?;
        let request = ReportRequest {
            dataset_id: id.clone(),
            focus: optional_str(arguments, keys::FOCUS).map(str::to_string),
            result_summary: truncate(&rendered, MAX_RESULT_SUMMARY),
        };

        let reporter = self.reporter.as_ref();
        let report = with_retry(self.policy, "generate_report", || {
            reporter.generate_report(&request)
        })
        .await
        .map_err(generation_error)?;
        if report.trim().is_empty() {
            return Err(generation_error(GenerationError::EmptyOutput));
        }

        Ok(HandlerOutput::new(json!({
            "dataset_id": id.as_str(),
            "report": report,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDatasets, FakeGenerator, args, context};
    use analyst_domain::{DatasetId, ErrorKind, ExecutionRecord};

    fn handler(generator: Arc<FakeGenerator>) -> GenerateAnalysisCodeHandler {
        GenerateAnalysisCodeHandler::new(
            Arc::new(FakeDatasets::sales()),
            generator,
            CollaboratorPolicy::default(),
        )
    }

    fn tool_error(err: HandlerError) -> ToolError {
        match err {
            HandlerError::Tool { error, .. } => error,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generates_code_for_sales_goal() {
        let generator = Arc::new(FakeGenerator::returning("local s = 0\nset_result(s)"));
        let mut state = SessionState::new();

        let output = handler(generator.clone())
            .handle(
                &args(json!({"goal": "sum of Sales column", "dataset_id": "sales"})),
                &context(),
                &mut state,
            )
            .await
            .unwrap();

        assert!(!output.payload["code"].as_str().unwrap().is_empty());
        assert_eq!(output.payload["regeneration"], false);
        let request = generator.last_code_request().unwrap();
        assert!(request.schema_context.contains("- Sales (integer)"));
        assert!(request.previous_attempt.is_none());
        let sales = DatasetId::parse("sales").unwrap();
        assert!(state.code_for(&sales).is_some());
    }

    #[tokio::test]
    async fn test_previous_attempt_forwarded_losslessly() {
        let generator = Arc::new(FakeGenerator::returning("set_result(1)"));
        let mut state = SessionState::new();
        let attempt = PreviousAttempt {
            code: "set_result(data[1].sales)".into(),
            error_kind: Some(ErrorKind::ExecutionFailure),
            error_message: "attempt to index a nil value".into(),
            planner_note: Some("wrong column case".into()),
        };

        handler(generator.clone())
            .handle(
                &args(json!({
                    "goal": "sum",
                    "dataset_id": "sales",
                    "previous_error": "wrong column case",
                    "previous_attempt": serde_json::to_value(&attempt).unwrap(),
                })),
                &context(),
                &mut state,
            )
            .await
            .unwrap();

        assert_eq!(generator.last_code_request().unwrap().previous_attempt, Some(attempt));
    }

    #[tokio::test]
    async fn test_empty_output_is_generation_failed() {
        let mut state = SessionState::new();
        let err = handler(Arc::new(FakeGenerator::returning("   \n")))
            .handle(&args(json!({"goal": "g", "dataset_id": "sales"})), &context(), &mut state)
            .await
            .unwrap_err();
        assert_eq!(tool_error(err).kind, ErrorKind::GenerationFailed);
        assert!(state.generated_code().is_none());
    }

    #[tokio::test]
    async fn test_generator_outage_is_generation_failed() {
        let mut state = SessionState::new();
        let err = handler(Arc::new(FakeGenerator::failing(GenerationError::Unavailable(
            "503".into(),
        ))))
        .handle(&args(json!({"goal": "g", "dataset_id": "sales"})), &context(), &mut state)
        .await
        .unwrap_err();
        assert_eq!(tool_error(err).kind, ErrorKind::GenerationFailed);
    }

    #[tokio::test]
    async fn test_report_uses_system_result() {
        let generator = Arc::new(FakeGenerator::returning("Sales total is 60."));
        let handler = GenerateReportHandler::new(generator.clone(), CollaboratorPolicy::default());
        let mut state = SessionState::new();

        let output = handler
            .handle(
                &args(json!({"dataset_id": "sales", "analysis_result": {"total": 60}})),
                &context(),
                &mut state,
            )
            .await
            .unwrap();

        assert_eq!(output.payload["report"], "Sales total is 60.");
        let request = generator.last_report_request().unwrap();
        assert!(request.result_summary.contains("\"total\": 60"));
    }

    #[tokio::test]
    async fn test_report_falls_back_to_session_result() {
        let generator = Arc::new(FakeGenerator::returning("ok"));
        let handler = GenerateReportHandler::new(generator.clone(), CollaboratorPolicy::default());
        let mut state = SessionState::new();
        let sales = DatasetId::parse("sales").unwrap();

        let err = handler
            .handle(&args(json!({"dataset_id": "sales"})), &context(), &mut state)
            .await
            .unwrap_err();
        assert_eq!(tool_error(err).kind, ErrorKind::PrerequisiteMissing);

        state.record_execution(ExecutionRecord::succeeded(sales, "c".into(), json!(5)));
        assert!(
            handler
                .handle(&args(json!({"dataset_id": "sales"})), &context(), &mut state)
                .await
                .is_ok()
        );
    }
}
