//! Hand-written port doubles shared by the unit tests.

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::datasets::{DatasetContentPort, DatasetError, DatasetSchemaPort};
use crate::ports::generation::{
    CodeGenerationPort, CodeRequest, GenerationError, ReportGenerationPort, ReportRequest,
};
use crate::ports::planner::{PlannerError, PlannerPort, PlannerView};
use crate::ports::sandbox::{SandboxError, SandboxPort};
use crate::ports::turn_progress::TurnProgressNotifier;
use crate::tools::StandardCollaborators;
use analyst_domain::{
    ColumnSchema, ColumnType, DatasetId, DatasetSchema, SandboxJob, SandboxOutcome,
    SessionContext, ToolArguments, ToolCall, ToolResult, TurnState,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn args(value: Value) -> ToolArguments {
    value.as_object().cloned().expect("arguments must be an object")
}

pub fn context() -> SessionContext {
    SessionContext::new("user-1", "session-1").with_team("team-1")
}

pub fn sales_rows() -> Vec<Value> {
    vec![
        json!({"Region": "North", "Sales": 10, "Month": "2024-01-01"}),
        json!({"Region": "South", "Sales": 20, "Month": "2024-01-01"}),
        json!({"Region": "East", "Sales": 30, "Month": "2024-02-01"}),
    ]
}

pub fn sales_schema() -> DatasetSchema {
    DatasetSchema::new(
        vec![
            ColumnSchema::new("Region", ColumnType::String),
            ColumnSchema::new("Sales", ColumnType::Integer),
            ColumnSchema::new("Month", ColumnType::Date),
        ],
        "Monthly sales by region",
    )
}

pub struct FakeDatasets {
    rows: HashMap<String, Vec<Value>>,
    schemas: HashMap<String, DatasetSchema>,
    unavailable: bool,
    schema_calls: AtomicUsize,
    row_calls: AtomicUsize,
}

impl FakeDatasets {
    pub fn sales() -> Self {
        Self {
            rows: HashMap::from([("sales".to_string(), sales_rows())]),
            schemas: HashMap::from([("sales".to_string(), sales_schema())]),
            unavailable: false,
            schema_calls: AtomicUsize::new(0),
            row_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_schemas(mut self) -> Self {
        self.schemas.clear();
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }

    pub fn row_calls(&self) -> usize {
        self.row_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetContentPort for FakeDatasets {
    async fn fetch_parsed_rows(&self, id: &DatasetId) -> Result<Vec<Value>, DatasetError> {
        self.row_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(DatasetError::Unavailable("connection refused".into()));
        }
        self.rows
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| DatasetError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl DatasetSchemaPort for FakeDatasets {
    async fn fetch_schema(&self, id: &DatasetId) -> Result<DatasetSchema, DatasetError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(DatasetError::Unavailable("connection refused".into()));
        }
        self.schemas
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| DatasetError::NotFound(id.to_string()))
    }
}

pub struct FakeGenerator {
    response: Result<String, GenerationError>,
    code_requests: Mutex<Vec<CodeRequest>>,
    report_requests: Mutex<Vec<ReportRequest>>,
}

impl FakeGenerator {
    pub fn returning(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            code_requests: Mutex::new(Vec::new()),
            report_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            response: Err(error),
            code_requests: Mutex::new(Vec::new()),
            report_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn code_requests(&self) -> Vec<CodeRequest> {
        self.code_requests.lock().unwrap().clone()
    }

    pub fn last_code_request(&self) -> Option<CodeRequest> {
        self.code_requests.lock().unwrap().last().cloned()
    }

    pub fn last_report_request(&self) -> Option<ReportRequest> {
        self.report_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CodeGenerationPort for FakeGenerator {
    async fn generate_code(&self, request: &CodeRequest) -> Result<String, GenerationError> {
        self.code_requests.lock().unwrap().push(request.clone());
        self.response.clone()
    }
}

#[async_trait]
impl ReportGenerationPort for FakeGenerator {
    async fn generate_report(&self, request: &ReportRequest) -> Result<String, GenerationError> {
        self.report_requests.lock().unwrap().push(request.clone());
        self.response.clone()
    }
}

/// Replays queued outcomes, then repeats the last one.
pub struct FakeSandbox {
    outcomes: Mutex<VecDeque<SandboxOutcome>>,
    last: Mutex<Option<SandboxOutcome>>,
    jobs: Mutex<Vec<SandboxJob>>,
}

impl FakeSandbox {
    pub fn returning(outcome: SandboxOutcome) -> Self {
        Self::sequence(vec![outcome])
    }

    pub fn sequence(outcomes: Vec<SandboxOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            last: Mutex::new(None),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn last_job(&self) -> Option<SandboxJob> {
        self.jobs.lock().unwrap().last().cloned()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

#[async_trait]
impl SandboxPort for FakeSandbox {
    async fn run(&self, job: SandboxJob) -> Result<SandboxOutcome, SandboxError> {
        self.jobs.lock().unwrap().push(job);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.outcomes.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone()
            .ok_or_else(|| SandboxError::Runtime("no outcome scripted".into()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn collaborators() -> StandardCollaborators {
    collaborators_with(
        FakeGenerator::returning("set_result(1)"),
        FakeSandbox::returning(SandboxOutcome::published(json!(1), vec![])),
    )
}

pub fn collaborators_with(generator: FakeGenerator, sandbox: FakeSandbox) -> StandardCollaborators {
    let datasets = Arc::new(FakeDatasets::sales());
    let generator = Arc::new(generator);
    StandardCollaborators {
        content: datasets.clone(),
        schemas: datasets,
        code_generator: generator.clone(),
        report_generator: generator,
        sandbox: Arc::new(sandbox),
    }
}

pub fn fast_params() -> ExecutionParams {
    ExecutionParams::default()
        .with_collaborator_timeout(std::time::Duration::from_secs(2))
        .with_collaborator_attempts(1)
}

/// Planner that replays a fixed list of calls.
pub struct QueuePlanner {
    calls: Mutex<VecDeque<ToolCall>>,
    seen_history: Mutex<Vec<usize>>,
}

impl QueuePlanner {
    pub fn new(calls: Vec<ToolCall>) -> Self {
        Self {
            calls: Mutex::new(calls.into()),
            seen_history: Mutex::new(Vec::new()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn seen_history(&self) -> Vec<usize> {
        self.seen_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlannerPort for QueuePlanner {
    async fn next_action(&self, view: &PlannerView<'_>) -> Result<ToolCall, PlannerError> {
        self.seen_history.lock().unwrap().push(view.history.len());
        self.calls
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(PlannerError::Exhausted)
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl TurnProgressNotifier for RecordingProgress {
    fn on_tool_call(&self, tool_name: &str, _arg_keys: &[&str]) {
        self.events.lock().unwrap().push(format!("call:{}", tool_name));
    }

    fn on_tool_result(&self, tool_name: &str, result: &ToolResult) {
        let status = match result.error_kind() {
            Some(kind) => kind.to_string(),
            None => "ok".to_string(),
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("result:{}:{}", tool_name, status));
    }

    fn on_regeneration(&self, attempt: usize, max: usize, _error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("regenerate:{}/{}", attempt, max));
    }

    fn on_turn_state(&self, state: &TurnState) {
        self.events
            .lock()
            .unwrap()
            .push(format!("state:{}", state.as_str()));
    }
}

#[derive(Default)]
pub struct RecordingLogger {
    pub events: Mutex<Vec<(&'static str, Value)>>,
}

impl RecordingLogger {
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

impl ConversationLogger for RecordingLogger {
    fn log(&self, event: ConversationEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.payload));
    }
}
