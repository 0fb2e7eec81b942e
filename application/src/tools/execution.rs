//! `execute_analysis_code`: runs generated code in the sandbox.

use super::dataset::dataset_id_parameter;
use super::handler::{HandlerError, HandlerOutput, ToolHandler, dataset_id, optional_str};
use super::{keys, names};
use crate::ports::sandbox::SandboxPort;
use analyst_domain::{
    ExecutionRecord, Prerequisite, SandboxJob, SessionContext, SessionState, ToolArguments,
    ToolDefinition, ToolError, ToolParameter,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub fn execute_analysis_code_definition() -> ToolDefinition {
    ToolDefinition::new(
        names::EXECUTE_ANALYSIS_CODE,
        "Run the most recently generated analysis code against the parsed rows of a dataset \
         and return the value it published.",
    )
    .with_parameter(dataset_id_parameter())
    .with_parameter(ToolParameter::new(
        keys::CODE,
        "Ignored; the session's generated code is always used",
        false,
    ))
    .with_system_argument(keys::CODE)
    .with_prerequisite(Prerequisite::ParsedData)
    .with_prerequisite(Prerequisite::GeneratedCode)
    .with_result(
        "The single value published by the code via set_result",
        ["dataset_id", "result"],
    )
}

pub struct ExecuteAnalysisCodeHandler {
    sandbox: Arc<dyn SandboxPort>,
    time_limit: Duration,
}

impl ExecuteAnalysisCodeHandler {
    pub fn new(sandbox: Arc<dyn SandboxPort>, time_limit: Duration) -> Self {
        Self {
            sandbox,
            time_limit,
        }
    }
}

#[async_trait]
impl ToolHandler for ExecuteAnalysisCodeHandler {
    async fn handle(
        &self,
        arguments: &ToolArguments,
        _context: &SessionContext,
        state: &mut SessionState,
    ) -> Result<HandlerOutput, HandlerError> {
        let id = dataset_id(arguments)?;
        let code = optional_str(arguments, keys::CODE)
            .ok_or_else(|| ToolError::prerequisite_missing("No analysis code to execute"))?
            .to_string();
        let rows = state.parsed_rows(&id).ok_or_else(|| {
            ToolError::prerequisite_missing(format!(
                "Dataset '{}' has not been parsed in this session",
                id
            ))
        })?;

        let job = SandboxJob::new(code.clone(), Value::Array(rows.to_vec()), self.time_limit);
        info!(
            dataset = %id,
            backend = self.sandbox.name(),
            time_limit_ms = job.time_limit_ms(),
            "Executing analysis code"
        );

        let outcome = self
            .sandbox
            .run(job)
            .await
            .map_err(|e| HandlerError::Internal(e.to_string()))?;

        match outcome.into_result() {
            Ok((value, logs)) => {
                state.record_execution(ExecutionRecord::succeeded(id.clone(), code, value.clone()));
                Ok(HandlerOutput::new(json!({
                    "dataset_id": id.as_str(),
                    "result": value,
                }))
                .with_logs(logs))
            }
            Err((error, logs)) => {
                warn!(dataset = %id, "Analysis code failed: {}", error);
                state.record_execution(ExecutionRecord::failed(id, code, error.clone()));
                Err(HandlerError::with_logs(error, logs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSandbox, args, context, sales_rows};
    use analyst_domain::{DatasetId, ErrorKind, SandboxFailure, SandboxOutcome};

    fn parsed_state() -> SessionState {
        let mut state = SessionState::new();
        state.store_parsed_rows(DatasetId::parse("sales").unwrap(), sales_rows());
        state
    }

    #[tokio::test]
    async fn test_success_records_execution() {
        let sandbox = Arc::new(FakeSandbox::returning(SandboxOutcome::published(
            json!(60),
            vec!["summing".into()],
        )));
        let handler = ExecuteAnalysisCodeHandler::new(sandbox.clone(), Duration::from_secs(5));
        let mut state = parsed_state();

        let output = handler
            .handle(
                &args(json!({"dataset_id": "sales", "code": "set_result(60)"})),
                &context(),
                &mut state,
            )
            .await
            .unwrap();

        assert_eq!(output.payload["result"], 60);
        assert_eq!(output.logs, vec!["summing"]);
        let job = sandbox.last_job().unwrap();
        assert_eq!(job.source_code, "set_result(60)");
        assert_eq!(job.input_data.as_array().unwrap().len(), 3);
        assert!(state.last_execution().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_timeout_has_no_result() {
        let sandbox = Arc::new(FakeSandbox::returning(SandboxOutcome::timeout(5000, vec![])));
        let handler = ExecuteAnalysisCodeHandler::new(sandbox, Duration::from_secs(5));
        let mut state = parsed_state();

        let err = handler
            .handle(
                &args(json!({"dataset_id": "sales", "code": "while true do end"})),
                &context(),
                &mut state,
            )
            .await
            .unwrap_err();

        match err {
            HandlerError::Tool { error, .. } => assert_eq!(error.kind, ErrorKind::ExecutionTimeout),
            other => panic!("unexpected {:?}", other),
        }
        let record = state.last_execution().unwrap();
        assert!(record.result.is_none());
        assert_eq!(record.error.as_ref().unwrap().kind, ErrorKind::ExecutionTimeout);
    }

    #[tokio::test]
    async fn test_no_result_published() {
        let sandbox = Arc::new(FakeSandbox::returning(SandboxOutcome::failed(
            SandboxFailure::NoResultPublished,
            vec![],
        )));
        let handler = ExecuteAnalysisCodeHandler::new(sandbox, Duration::from_secs(5));
        let mut state = parsed_state();
        let err = handler
            .handle(
                &args(json!({"dataset_id": "sales", "code": "local x = 1"})),
                &context(),
                &mut state,
            )
            .await
            .unwrap_err();
        match err {
            HandlerError::Tool { error, .. } => {
                assert_eq!(error.kind, ErrorKind::ExecutionNoResult)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparsed_dataset_is_prerequisite_missing() {
        let sandbox = Arc::new(FakeSandbox::returning(SandboxOutcome::published(json!(1), vec![])));
        let handler = ExecuteAnalysisCodeHandler::new(sandbox.clone(), Duration::from_secs(5));
        let mut state = SessionState::new();
        let err = handler
            .handle(
                &args(json!({"dataset_id": "sales", "code": "set_result(1)"})),
                &context(),
                &mut state,
            )
            .await
            .unwrap_err();
        match err {
            HandlerError::Tool { error, .. } => {
                assert_eq!(error.kind, ErrorKind::PrerequisiteMissing)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(sandbox.last_job().is_none());
    }
}
