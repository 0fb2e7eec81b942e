//! Run Turn use case
//!
//! Drives one user turn: ask the planner for the next tool call, dispatch it
//! through the [`ToolContract`], and apply the transition its result implies.
//!
//! | Result                                  | Turn                          |
//! |-----------------------------------------|-------------------------------|
//! | success, `ask_for_clarification`        | paused for clarification      |
//! | success, `final_answer`                 | answered                      |
//! | `INVALID_ARGUMENT`, `PREREQUISITE_MISSING` | continues                  |
//! | `EXECUTION_*`                           | continues until the regeneration bound |
//! | `GENERATION_FAILED`                     | failed                        |
//! | `INVALID_TOOL_RESULT`, `TOOL_EXECUTION_ERROR` | failed                  |

mod dispatch;
mod types;

pub use types::RunTurnError;

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::planner::{PlannerError, PlannerPort, PlannerView};
use crate::ports::turn_progress::{NoTurnProgress, TurnProgressNotifier};
use crate::tools::{ToolContract, ToolRegistry};
use crate::use_cases::shared::{is_cancelled, with_retry};
use analyst_domain::{AnalysisSession, ToolCall, Turn, TurnFailure};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Orchestrates turns for one registry and execution policy.
#[derive(Clone)]
pub struct TurnOrchestrator {
    contract: ToolContract,
    params: ExecutionParams,
    progress: Arc<dyn TurnProgressNotifier>,
    logger: Arc<dyn ConversationLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl TurnOrchestrator {
    pub fn new(registry: Arc<ToolRegistry>, params: ExecutionParams) -> Self {
        Self {
            contract: ToolContract::new(registry),
            params,
            progress: Arc::new(NoTurnProgress),
            logger: Arc::new(NoConversationLogger),
            cancellation_token: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn TurnProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    /// Set the transcript sink for turn events
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn contract(&self) -> &ToolContract {
        &self.contract
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    /// Run a full turn for `user_message` and archive it in the session.
    ///
    /// Returns the turn once it is paused, answered or failed. Collaborator
    /// and tool failures are recorded in the turn state rather than returned.
    pub async fn run_turn(
        &self,
        session: &mut AnalysisSession,
        user_message: &str,
        planner: &dyn PlannerPort,
    ) -> Result<Turn, RunTurnError> {
        let mut turn = session.begin_turn(user_message);
        info!(
            session_id = %session.context.session_id,
            user_id = %session.context.user_id,
            turn = turn.number,
            "Turn started"
        );
        self.progress.on_turn_start(turn.number, user_message);
        self.logger.log(ConversationEvent::new(
            "turn_started",
            json!({
                "session_id": session.context.session_id,
                "turn": turn.number,
                "user_message": user_message,
                "answers_clarification": turn.answers_clarification,
            }),
        ));

        while turn.is_in_progress() {
            if is_cancelled(&self.cancellation_token) {
                self.close(session, &mut turn, TurnFailure::Cancelled)?;
                break;
            }
            if turn.steps() >= self.params.max_steps {
                warn!(
                    turn = turn.number,
                    max_steps = self.params.max_steps,
                    "Step budget exhausted"
                );
                self.close(
                    session,
                    &mut turn,
                    TurnFailure::StepBudgetExhausted {
                        max_steps: self.params.max_steps,
                    },
                )?;
                break;
            }

            match self.next_action(&turn, planner).await {
                None => self.close(session, &mut turn, TurnFailure::Cancelled)?,
                Some(Err(e)) => {
                    warn!(turn = turn.number, "Planner failed: {}", e);
                    self.close(
                        session,
                        &mut turn,
                        TurnFailure::PlannerFailed {
                            message: e.to_string(),
                        },
                    )?;
                }
                Some(Ok(call)) => {
                    self.dispatch(session, &mut turn, call).await?;
                }
            }
        }

        info!(
            session_id = %session.context.session_id,
            turn = turn.number,
            state = turn.state.as_str(),
            steps = turn.steps(),
            "Turn finished"
        );
        self.logger.log(ConversationEvent::new(
            "turn_finished",
            json!({
                "session_id": session.context.session_id,
                "turn": turn.number,
                "steps": turn.steps(),
                "state": turn.state,
            }),
        ));

        session.record_turn(turn.clone());
        self.progress.on_turn_complete(&turn);
        Ok(turn)
    }

    /// Ask the planner for the next call. `None` means the turn was cancelled
    /// while waiting.
    async fn next_action(
        &self,
        turn: &Turn,
        planner: &dyn PlannerPort,
    ) -> Option<Result<ToolCall, PlannerError>> {
        let view = PlannerView {
            user_message: &turn.user_message,
            answers_clarification: turn.answers_clarification.as_deref(),
            tools: self.contract.registry().definitions(),
            history: &turn.history,
            remaining_steps: self.params.max_steps.saturating_sub(turn.steps()),
        };
        let view = &view;
        let request = with_retry(self.params.collaborator_policy(), "planner", || {
            planner.next_action(view)
        });

        match &self.cancellation_token {
            Some(token) => tokio::select! {
                _ = token.cancelled() => None,
                result = request => Some(result),
            },
            None => Some(request.await),
        }
    }

    fn close(
        &self,
        session: &AnalysisSession,
        turn: &mut Turn,
        failure: TurnFailure,
    ) -> Result<(), RunTurnError> {
        turn.fail(failure)?;
        self.emit_state(session, turn);
        Ok(())
    }

    fn emit_state(&self, session: &AnalysisSession, turn: &Turn) {
        self.progress.on_turn_state(&turn.state);
        self.logger.log(ConversationEvent::new(
            "turn_state",
            json!({
                "session_id": session.context.session_id,
                "turn": turn.number,
                "state": turn.state,
            }),
        ));
    }
}
