//! Session entities

use super::turn::{Turn, TurnArtifacts};
use crate::dataset::{DatasetId, DatasetSchema};
use crate::tool::entities::Prerequisite;
use crate::tool::value_objects::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Identity of the caller, attached to every invocation for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            team_id: None,
        }
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }
}

/// Code produced by the generation step, held until executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub dataset_id: DatasetId,
    pub goal: String,
    pub code: String,
}

/// Outcome of the most recent sandbox run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub dataset_id: DatasetId,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ExecutionRecord {
    pub fn succeeded(dataset_id: DatasetId, code: String, result: Value) -> Self {
        Self {
            dataset_id,
            code,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(dataset_id: DatasetId, code: String, error: ToolError) -> Self {
        Self {
            dataset_id,
            code,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }
}

/// Artifacts carried across tool calls and turns of one session.
///
/// Owned by the orchestrator and handed to each invocation by `&mut`, so no
/// two calls ever observe it concurrently.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    schemas: HashMap<DatasetId, DatasetSchema>,
    parsed_rows: HashMap<DatasetId, Vec<Value>>,
    generated_code: Option<GeneratedCode>,
    last_execution: Option<ExecutionRecord>,
    pending_clarification: Option<String>,
    /// Turn currently running; artifacts are stamped with it
    current_turn: usize,
    code_turn: Option<usize>,
    execution_turn: Option<usize>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self, id: &DatasetId) -> Option<&DatasetSchema> {
        self.schemas.get(id)
    }

    pub fn store_schema(&mut self, id: DatasetId, schema: DatasetSchema) {
        self.schemas.insert(id, schema);
    }

    pub fn parsed_rows(&self, id: &DatasetId) -> Option<&[Value]> {
        self.parsed_rows.get(id).map(Vec::as_slice)
    }

    pub fn store_parsed_rows(&mut self, id: DatasetId, rows: Vec<Value>) {
        self.parsed_rows.insert(id, rows);
    }

    pub fn generated_code(&self) -> Option<&GeneratedCode> {
        self.generated_code.as_ref()
    }

    /// Generated code targeting the given dataset.
    pub fn code_for(&self, id: &DatasetId) -> Option<&GeneratedCode> {
        self.generated_code.as_ref().filter(|g| &g.dataset_id == id)
    }

    pub fn store_generated_code(&mut self, code: GeneratedCode) {
        self.generated_code = Some(code);
        self.code_turn = Some(self.current_turn);
    }

    pub fn last_execution(&self) -> Option<&ExecutionRecord> {
        self.last_execution.as_ref()
    }

    /// Last execution against the dataset, if it succeeded.
    pub fn successful_execution_for(&self, id: &DatasetId) -> Option<&ExecutionRecord> {
        self.last_execution
            .as_ref()
            .filter(|e| &e.dataset_id == id && e.is_success())
    }

    pub fn record_execution(&mut self, record: ExecutionRecord) {
        self.last_execution = Some(record);
        self.execution_turn = Some(self.current_turn);
    }

    /// Code and execution produced during the given turn. Artifacts left
    /// over from earlier turns are not included.
    pub fn artifacts_of_turn(&self, number: usize) -> TurnArtifacts {
        TurnArtifacts {
            generated_code: self
                .generated_code
                .clone()
                .filter(|_| self.code_turn == Some(number)),
            execution: self
                .last_execution
                .clone()
                .filter(|_| self.execution_turn == Some(number)),
        }
    }

    pub fn pending_clarification(&self) -> Option<&str> {
        self.pending_clarification.as_deref()
    }

    pub fn set_pending_clarification(&mut self, question: impl Into<String>) {
        self.pending_clarification = Some(question.into());
    }

    pub fn take_pending_clarification(&mut self) -> Option<String> {
        self.pending_clarification.take()
    }

    pub fn satisfies(&self, prerequisite: Prerequisite, id: &DatasetId) -> bool {
        match prerequisite {
            Prerequisite::ParsedData => self.parsed_rows.contains_key(id),
            Prerequisite::GeneratedCode => self.code_for(id).is_some(),
            Prerequisite::ExecutionResult => self.successful_execution_for(id).is_some(),
        }
    }

    /// First prerequisite not yet satisfied for the dataset.
    pub fn missing_prerequisite(
        &self,
        prerequisites: &[Prerequisite],
        id: &DatasetId,
    ) -> Option<Prerequisite> {
        prerequisites.iter().copied().find(|p| !self.satisfies(*p, id))
    }
}

/// One user's conversation with the analysis agent.
///
/// Turns borrow the session mutably, so at most one turn per session is
/// ever active.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    pub context: SessionContext,
    pub state: SessionState,
    turns: Vec<Turn>,
}

impl AnalysisSession {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            state: SessionState::new(),
            turns: Vec::new(),
        }
    }

    /// Start a turn for a new user message.
    ///
    /// A pending clarification is resolved by this message: the question is
    /// recorded on the turn and the pause is cleared.
    pub fn begin_turn(&mut self, user_message: impl Into<String>) -> Turn {
        let number = self.turns.len() + 1;
        let mut turn = Turn::new(number, user_message);
        self.state.current_turn = number;
        if let Some(question) = self.state.take_pending_clarification() {
            turn.answers_clarification = Some(question);
        }
        turn
    }

    /// Archive a finished or paused turn.
    pub fn record_turn(&mut self, turn: Turn) {
        if let Some(question) = turn.state.clarification_question() {
            self.state.set_pending_clarification(question);
        }
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
