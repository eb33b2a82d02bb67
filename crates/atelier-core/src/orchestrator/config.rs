//! Orchestrator runtime configuration.

use std::time::Duration;

/// Tunables for scheduling, timeouts, and caching.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Global cap on concurrently running agent invocations
    pub max_concurrent_agents: usize,
    /// Default per-task deadline, used when a task carries none
    pub agent_timeout: Duration,
    /// Time-to-live for cached agent results
    pub cache_ttl: Duration,
    /// Category assigned when decomposition yields a single passthrough task
    pub default_category: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: 4,
            agent_timeout: Duration::from_secs(120),
            cache_ttl: Duration::from_secs(900),
            default_category: "general".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Set the concurrency cap (clamped to at least 1)
    #[must_use]
    pub fn with_max_concurrent_agents(mut self, max: usize) -> Self {
        self.max_concurrent_agents = max.max(1);
        self
    }

    /// Set the default per-task deadline
    #[must_use]
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Set the cache time-to-live
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the fallback category for passthrough tasks
    #[must_use]
    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }
}
