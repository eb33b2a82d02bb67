//! Orchestrator — owns decomposition, scheduling, caching, and assembly.

use super::assemble::assemble;
use super::config::OrchestratorConfig;
use super::plan::Planner;
use super::types::{OrchestratorRequest, OrchestratorResponse};
use crate::agent::Agent;
use crate::cache::ResponseCache;
use crate::error::Result;
use crate::registry::AgentRegistry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Central coordinator for design-automation requests.
///
/// One instance serves many concurrent requests; all shared state is behind
/// concurrent maps. Agents are registered once at startup and looked up by
/// the name their spec carries.
pub struct Orchestrator {
    pub(super) config: OrchestratorConfig,
    pub(super) registry: Arc<AgentRegistry>,
    pub(super) agents: HashMap<String, Arc<dyn Agent>>,
    pub(super) planner: Planner,
    pub(super) cache: ResponseCache,
    active: DashMap<Uuid, CancellationToken>,
}

impl Orchestrator {
    /// Create an orchestrator over a registry and a planner
    #[must_use]
    pub fn new(registry: AgentRegistry, planner: Planner) -> Self {
        Self {
            config: OrchestratorConfig::default(),
            registry: Arc::new(registry),
            agents: HashMap::new(),
            planner,
            cache: ResponseCache::new(),
            active: DashMap::new(),
        }
    }

    /// Set the runtime configuration
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a runtime agent, keyed by its name.
    ///
    /// Every agent name the registry can resolve to must be attached before
    /// requests are served; tasks resolving to a missing instance fail.
    #[must_use]
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(agent.name().to_string(), agent);
        self
    }

    /// Registry backing this orchestrator
    #[must_use]
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Handle a request end to end: decompose, schedule, assemble.
    ///
    /// Decomposition failures (invalid plans, unresolvable categories) are
    /// request-level errors; per-task failures are reported in the response.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn handle(&self, request: OrchestratorRequest) -> Result<OrchestratorResponse> {
        let start = Instant::now();
        let cancel = CancellationToken::new();
        self.active.insert(request.id, cancel.clone());

        let outcome = self.handle_inner(&request, &cancel).await;
        self.active.remove(&request.id);

        match outcome {
            Ok(mut response) => {
                response.latency_ms = start.elapsed().as_millis() as u64;
                info!(
                    status = ?response.status,
                    tasks = response.results.len(),
                    latency_ms = response.latency_ms,
                    "Request completed"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Request failed before scheduling");
                Err(e)
            }
        }
    }

    async fn handle_inner(
        &self,
        request: &OrchestratorRequest,
        cancel: &CancellationToken,
    ) -> Result<OrchestratorResponse> {
        let plan = self.planner.plan(&request.instruction, &self.registry).await?;
        info!(tasks = plan.tasks.len(), "Plan validated");

        let results = self.execute_tasks(&plan.tasks, cancel).await;
        let (status, results) = assemble(&plan.tasks, results);

        Ok(OrchestratorResponse {
            request_id: request.id,
            session_id: request.session_id.clone(),
            status,
            summary: plan.summary,
            results,
            latency_ms: 0,
        })
    }

    /// Cancel an in-flight request. Returns false if the id is unknown or
    /// the request already finished.
    pub fn cancel(&self, request_id: Uuid) -> bool {
        if let Some((_, token)) = self.active.remove(&request_id) {
            info!(%request_id, "Cancelling request");
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Number of requests currently in flight
    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.active.len()
    }

    /// Drop expired cache entries. Returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.cache.sweep()
    }
}
