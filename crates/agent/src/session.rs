//! Conversation session: transcript, pending input and the turn state machine.
//!
//! ```text
//! Empty ──render──▶ AwaitingInput ──submit──▶ Processing
//!                        ▲                        │
//!                        └──── success/failure ───┘
//! ```
//!
//! A successful submission appends exactly two turns (user, then assistant).
//! A failed one appends nothing. There is no terminal state.

use chrono::{DateTime, Utc};
use dermachat_core::context::{ContextSource, PatientContext, ResolvedContext};
use dermachat_core::error::SessionError;
use dermachat_core::message::{SessionId, Turn};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::pipeline::RagPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, never rendered.
    Empty,
    /// Idle, waiting for the next question.
    AwaitingInput,
    /// A submission is running the pipeline.
    Processing,
}

/// What a submission did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Pending input was blank; nothing changed.
    Ignored,
    /// Two turns were appended.
    Answered { user: Turn, assistant: Turn },
}

/// One dermatologist's conversation about one patient.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: SessionId,
    resolved: ResolvedContext,
    turns: Vec<Turn>,
    pending_input: String,
    state: SessionState,
    created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create a session around an already-resolved context.
    pub fn new(resolved: ResolvedContext) -> Self {
        Self {
            id: SessionId::new(),
            resolved,
            turns: Vec::new(),
            pending_input: String::new(),
            state: SessionState::Empty,
            created_at: Utc::now(),
        }
    }

    /// Resolve the patient context once and create the session.
    pub async fn start(source: &dyn ContextSource) -> Self {
        let resolved = source.resolve().await;
        for warning in &resolved.warnings {
            warn!(source = source.name(), %warning, "Context resolved with warning");
        }
        let session = Self::new(resolved);
        info!(session = %session.id, source = source.name(), "Session started");
        session
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &PatientContext {
        &self.resolved.context
    }

    pub fn warnings(&self) -> &[String] {
        &self.resolved.warnings
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Return the transcript for display. The first render leaves `Empty`.
    pub fn render(&mut self) -> &[Turn] {
        if self.state == SessionState::Empty {
            self.state = SessionState::AwaitingInput;
        }
        &self.turns
    }

    /// Replace the pending input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    /// Run the pipeline on the pending input.
    ///
    /// Blank input is ignored. On success the input buffer is cleared; on
    /// failure it is kept and the error is returned with the transcript
    /// untouched.
    pub async fn submit(
        &mut self,
        pipeline: &RagPipeline,
    ) -> Result<SubmitOutcome, dermachat_core::Error> {
        match self.state {
            SessionState::Processing => {
                return Err(SessionError::Busy(self.id.to_string()).into());
            }
            SessionState::Empty => self.state = SessionState::AwaitingInput,
            SessionState::AwaitingInput => {}
        }

        if self.pending_input.trim().is_empty() {
            debug!(session = %self.id, "Blank input ignored");
            return Ok(SubmitOutcome::Ignored);
        }

        let query = self.pending_input.clone();
        self.state = SessionState::Processing;

        let result = {
            let _guard = ProcessingGuard {
                state: &mut self.state,
            };
            pipeline.run(&self.resolved.context, &query).await
        };

        match result {
            Ok(answer) => {
                let user = Turn::user(query);
                let assistant = Turn::assistant(answer.answer);
                self.turns.push(user.clone());
                self.turns.push(assistant.clone());
                self.pending_input.clear();
                info!(session = %self.id, turns = self.turns.len(), "Turn answered");
                Ok(SubmitOutcome::Answered { user, assistant })
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "Turn failed");
                Err(e)
            }
        }
    }
}

/// Returns the session to `AwaitingInput` when a submission finishes,
/// including when its future is dropped mid-flight.
struct ProcessingGuard<'a> {
    state: &'a mut SessionState,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        *self.state = SessionState::AwaitingInput;
    }
}
