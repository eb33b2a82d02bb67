//! Request and response types for the orchestrator boundary.

use crate::task::TaskResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A design-automation request submitted to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorRequest {
    /// Request id, assigned on creation
    pub id: Uuid,
    /// Free-form instruction to decompose
    pub instruction: String,
    /// Caller-supplied session id, echoed back on the response so the CAD
    /// host can correlate requests with its own sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl OrchestratorRequest {
    /// Create a request with a fresh id
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instruction: instruction.into(),
            session_id: None,
        }
    }

    /// Attach the caller's session id
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Overall outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every task succeeded
    Succeeded,
    /// Some tasks succeeded, some did not
    Partial,
    /// No task succeeded
    Failed,
}

/// Assembled response for a request.
///
/// Per-task results appear in dependency order: a task's result is never
/// listed before the results of its dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorResponse {
    /// Id of the originating request
    pub request_id: Uuid,
    /// Session id the request carried, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Overall outcome
    pub status: OverallStatus,
    /// Coordinator's one-line summary of the decomposition, when one was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Per-task results in dependency order
    pub results: Vec<TaskResult>,
    /// End-to-end latency in milliseconds
    pub latency_ms: u64,
}
