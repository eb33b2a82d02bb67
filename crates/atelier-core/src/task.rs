//! Task types — units of work and their results.

use atelier_knowledge::Citation;
use serde::{Deserialize, Serialize};

/// A unit of work produced by decomposition.
///
/// Ids are unique within a request. A task never starts before every id in
/// `depends_on` has reached a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task id, unique within the request
    pub id: String,
    /// Category used to resolve the serving agent
    pub category: String,
    /// Free-form structured input payload
    pub input: String,
    /// Ids of tasks that must complete first
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Optional per-task deadline in milliseconds (overrides the global one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

impl Task {
    /// Create a new task
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            input: input.into(),
            depends_on: Vec::new(),
            deadline_ms: None,
        }
    }

    /// Add an ordering dependency
    #[must_use]
    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.depends_on.push(task_id.into());
        self
    }

    /// Set a per-task deadline in milliseconds
    #[must_use]
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }
}

/// Terminal status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Completed successfully
    Succeeded,
    /// Failed with a recorded error
    Failed,
    /// Exceeded its deadline
    TimedOut,
}

impl TaskStatus {
    /// Whether this status is a success
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Kind of a per-task failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// Backing model endpoint unreachable
    ModelUnavailable,
    /// Backing model call exceeded its deadline
    ModelTimeout,
    /// Backing model declined or returned an error payload
    ModelRefusal,
    /// Knowledge store could not be reached
    StoreUnavailable,
    /// A dependency failed or timed out, so this task never ran
    UpstreamFailure,
    /// The request was cancelled before this task finished
    Cancelled,
}

/// Structured per-task error, carried in the task's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// Failure kind
    pub kind: TaskErrorKind,
    /// Human-readable message
    pub message: String,
}

impl TaskError {
    /// Create a new task error
    #[must_use]
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<atelier_llm::Error> for TaskError {
    fn from(e: atelier_llm::Error) -> Self {
        let kind = match &e {
            atelier_llm::Error::Unavailable(_) | atelier_llm::Error::NotConfigured(_) => {
                TaskErrorKind::ModelUnavailable
            }
            atelier_llm::Error::Timeout(_) => TaskErrorKind::ModelTimeout,
            atelier_llm::Error::Refusal(_) => TaskErrorKind::ModelRefusal,
            atelier_llm::Error::Embedding(_) => TaskErrorKind::StoreUnavailable,
        };
        Self::new(kind, e.to_string())
    }
}

/// Result of a task, owned by the orchestrator until merged.
///
/// Immutable once produced. Citations are non-empty only for tasks served by
/// a retrieval-enabled agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the task this result belongs to
    pub task_id: String,
    /// Terminal status
    pub status: TaskStatus,
    /// Output payload (text, code, or serialized structured data)
    pub payload: String,
    /// Supporting citations for retrieval-backed tasks
    pub citations: Vec<Citation>,
    /// Wall-clock latency in milliseconds
    pub latency_ms: u64,
    /// Failure detail, present iff status is not `Succeeded`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskResult {
    /// Build a success result
    #[must_use]
    pub fn succeeded(
        task_id: impl Into<String>,
        payload: impl Into<String>,
        citations: Vec<Citation>,
        latency_ms: u64,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Succeeded,
            payload: payload.into(),
            citations,
            latency_ms,
            error: None,
        }
    }

    /// Build a failure result
    #[must_use]
    pub fn failed(task_id: impl Into<String>, error: TaskError, latency_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            payload: String::new(),
            citations: Vec::new(),
            latency_ms,
            error: Some(error),
        }
    }

    /// Build a timeout result
    #[must_use]
    pub fn timed_out(task_id: impl Into<String>, deadline_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::TimedOut,
            payload: String::new(),
            citations: Vec::new(),
            latency_ms: deadline_ms,
            error: Some(TaskError::new(
                TaskErrorKind::ModelTimeout,
                format!("task exceeded its {deadline_ms}ms deadline"),
            )),
        }
    }

    /// Clone this result for another task id (cache hits and coalesced calls)
    #[must_use]
    pub fn for_task(&self, task_id: impl Into<String>) -> Self {
        let mut result = self.clone();
        result.task_id = task_id.into();
        result
    }
}
