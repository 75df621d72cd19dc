//! Session state for one skill run.

use serde::{Deserialize, Serialize};
use skillstream_core::{SessionError, SessionId, SessionStatus, Skill};

/// One run of one skill, from prompt submission to a terminal status.
///
/// Snapshots of this struct are what observers see; the controller is the
/// only writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSession {
    /// Unique id for this run.
    pub id: SessionId,
    /// The skill being executed. Read-only for the session's lifetime.
    pub skill: Skill,
    /// The input supplied at session start, already trimmed.
    pub prompt: String,
    /// Generated text, appended to strictly in arrival order.
    pub accumulated_output: String,
    /// Current position in the state machine.
    pub status: SessionStatus,
    /// Failure details; present only when `status == Errored`.
    pub error: Option<SessionError>,
    /// Server-reported wall time; present only when `status == Finished`.
    pub execution_time_seconds: Option<f64>,
}

impl ExecutionSession {
    /// Create a fresh session in the `Requesting` state.
    #[must_use]
    pub fn new(id: SessionId, skill: Skill, prompt: impl Into<String>) -> Self {
        Self {
            id,
            skill,
            prompt: prompt.into(),
            accumulated_output: String::new(),
            status: SessionStatus::Requesting,
            error: None,
            execution_time_seconds: None,
        }
    }
}
