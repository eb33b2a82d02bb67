//! Agents — uniform invoke contract over backing models.
//!
//! Both variants share one trait so the orchestrator dispatches uniformly:
//! `TaskAgent` forwards the payload to its backing model; `RetrievalAgent`
//! first queries the knowledge store and grounds the prompt in the retrieved
//! passages, reporting them as citations.

use crate::registry::AgentSpec;
use crate::task::{Task, TaskError, TaskErrorKind, TaskResult};
use atelier_knowledge::{Citation, KnowledgeStore, ScoredChunk};
use atelier_llm::{ModelClient, ModelRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Uniform invocation contract for all agent variants.
///
/// `invoke` is synchronous from the orchestrator's perspective; the await is
/// the suspension point at the model-call boundary. Failures come back as
/// structured `TaskError`s, never as silently defaulted answers.
#[async_trait::async_trait]
pub trait Agent: Send + Sync {
    /// Agent name (matches its registered spec)
    fn name(&self) -> &str;

    /// Whether answers are grounded in the knowledge store
    fn retrieval_enabled(&self) -> bool {
        false
    }

    /// Capability summary used in the coordinator roster
    fn description(&self) -> &str;

    /// System instructions sent with every task, if any
    fn system_prompt(&self) -> Option<&str> {
        None
    }

    /// Run a task to completion
    async fn invoke(&self, task: &Task) -> std::result::Result<TaskResult, TaskError>;
}

/// Retrieval parameters for a retrieval-augmented agent.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Maximum passages to retrieve per task
    pub k: usize,
    /// Minimum similarity score for a passage to be used
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            min_score: 0.25,
        }
    }
}

/// Generic non-retrieval agent: code generation, data transforms.
pub struct TaskAgent {
    spec: AgentSpec,
    client: Arc<dyn ModelClient>,
    system_prompt: Option<String>,
}

impl TaskAgent {
    /// Create a task agent over a backing model client
    #[must_use]
    pub fn new(spec: AgentSpec, client: Arc<dyn ModelClient>) -> Self {
        Self {
            spec,
            client,
            system_prompt: None,
        }
    }

    /// Set the system instructions sent with every task
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait::async_trait]
impl Agent for TaskAgent {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    #[instrument(skip(self, task), fields(agent = %self.spec.name, task_id = %task.id))]
    async fn invoke(&self, task: &Task) -> std::result::Result<TaskResult, TaskError> {
        let start = Instant::now();

        let mut request = ModelRequest::new(task.input.clone());
        if let Some(system) = &self.system_prompt {
            request = request.with_system(system.clone());
        }

        let response = self.client.complete(request).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        debug!(latency_ms, "Task agent completed");
        Ok(TaskResult::succeeded(
            task.id.clone(),
            response.text,
            Vec::new(),
            latency_ms,
        ))
    }
}

/// Retrieval-augmented agent: grounds its model call in standards passages.
pub struct RetrievalAgent {
    spec: AgentSpec,
    client: Arc<dyn ModelClient>,
    store: Arc<KnowledgeStore>,
    retrieval: RetrievalConfig,
    system_prompt: Option<String>,
    degrade_on_store_failure: bool,
}

impl RetrievalAgent {
    /// Create a retrieval-augmented agent
    #[must_use]
    pub fn new(
        spec: AgentSpec,
        client: Arc<dyn ModelClient>,
        store: Arc<KnowledgeStore>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            spec,
            client,
            store,
            retrieval,
            system_prompt: None,
            degrade_on_store_failure: false,
        }
    }

    /// Set the system instructions sent with every task
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Degrade to an ungrounded answer (empty citations) when the knowledge
    /// store is unreachable, instead of failing the task.
    #[must_use]
    pub fn with_store_degradation(mut self, degrade: bool) -> Self {
        self.degrade_on_store_failure = degrade;
        self
    }

    /// Build the grounded prompt from retrieved passages.
    fn grounded_prompt(task_input: &str, passages: &[ScoredChunk]) -> String {
        if passages.is_empty() {
            return format!(
                "No standards passages matched this request. State explicitly when an \
                 answer cannot be grounded in the standards.\n\nRequest:\n{task_input}"
            );
        }

        let mut prompt = String::from(
            "Answer using only the referenced standards passages. Cite passages by \
             their bracketed number.\n\n",
        );
        for (i, scored) in passages.iter().enumerate() {
            prompt.push_str(&format!(
                "[{}] {} {}\n{}\n\n",
                i + 1,
                scored.chunk.document_id,
                scored.chunk.locator,
                scored.chunk.text
            ));
        }
        prompt.push_str(&format!("Request:\n{task_input}"));
        prompt
    }
}

#[async_trait::async_trait]
impl Agent for RetrievalAgent {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn retrieval_enabled(&self) -> bool {
        true
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    #[instrument(skip(self, task), fields(agent = %self.spec.name, task_id = %task.id))]
    async fn invoke(&self, task: &Task) -> std::result::Result<TaskResult, TaskError> {
        let start = Instant::now();

        let passages = match self
            .store
            .query(&task.input, self.retrieval.k, self.retrieval.min_score)
            .await
        {
            Ok(passages) => passages,
            Err(e) if self.degrade_on_store_failure => {
                warn!(error = %e, "Knowledge store unavailable, degrading to ungrounded answer");
                Vec::new()
            }
            Err(e) => {
                return Err(TaskError::new(TaskErrorKind::StoreUnavailable, e.to_string()));
            }
        };

        let citations: Vec<Citation> = passages.iter().map(ScoredChunk::citation).collect();

        let mut request = ModelRequest::new(Self::grounded_prompt(&task.input, &passages));
        if let Some(system) = &self.system_prompt {
            request = request.with_system(system.clone());
        }

        let response = self.client.complete(request).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        debug!(latency_ms, citations = citations.len(), "Retrieval agent completed");
        Ok(TaskResult::succeeded(
            task.id.clone(),
            response.text,
            citations,
            latency_ms,
        ))
    }
}
