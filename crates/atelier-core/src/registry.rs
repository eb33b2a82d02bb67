//! Agent registry — per-agent configuration and category resolution.
//!
//! Built once from configuration at process start and read-only afterwards;
//! workers resolve categories concurrently without synchronization.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Where a backing model runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Cloud API — reserved for the orchestrator's coordination role
    Cloud,
    /// Locally hosted inference server
    Local,
}

/// Reference to a backing model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRef {
    /// Cloud or local
    pub kind: ModelKind,
    /// Endpoint URL
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Context window size in tokens
    pub context_window: u32,
}

/// Immutable per-agent configuration.
///
/// Created at process start from configuration, never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique agent name
    pub name: String,
    /// Capability tags (task categories this agent can serve)
    pub capabilities: Vec<String>,
    /// Backing model reference
    pub model: ModelRef,
    /// Whether answers are grounded in the knowledge store
    pub retrieval: bool,
    /// Resolution priority — lower values win when several agents share a tag
    pub priority: u32,
    /// Capability summary shown to the coordination model
    pub description: String,
}

impl AgentSpec {
    /// Create a spec with default priority and no capabilities
    #[must_use]
    pub fn new(name: impl Into<String>, model: ModelRef) -> Self {
        Self {
            name: name.into(),
            capabilities: Vec::new(),
            model,
            retrieval: false,
            priority: 100,
            description: String::new(),
        }
    }

    /// Add a capability tag
    #[must_use]
    pub fn with_capability(mut self, category: impl Into<String>) -> Self {
        self.capabilities.push(category.into());
        self
    }

    /// Mark the agent as retrieval-enabled
    #[must_use]
    pub fn with_retrieval(mut self, retrieval: bool) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Set the resolution priority (lower wins)
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the capability summary
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Holds all registered agent specs and resolves categories to agents.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    specs: Vec<AgentSpec>,
    by_name: HashMap<String, usize>,
}

impl AgentRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent spec.
    ///
    /// Fails with `DuplicateAgent` if the name is already taken.
    pub fn register(&mut self, spec: AgentSpec) -> Result<()> {
        if self.by_name.contains_key(&spec.name) {
            return Err(Error::DuplicateAgent(spec.name));
        }
        debug!(agent = %spec.name, capabilities = ?spec.capabilities, "Registering agent");
        self.by_name.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Resolve a category to the serving agent spec.
    ///
    /// When several agents declare the tag, the lowest `priority` value wins;
    /// equal priorities resolve to the earliest-registered agent. This
    /// tie-break is fixed and covered by tests — never ambiguous.
    pub fn resolve(&self, category: &str) -> Result<&AgentSpec> {
        self.specs
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.capabilities.iter().any(|c| c == category))
            .min_by_key(|(index, spec)| (spec.priority, *index))
            .map(|(_, spec)| spec)
            .ok_or_else(|| Error::NoAgentForCategory(category.to_string()))
    }

    /// Look up a spec by agent name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AgentSpec> {
        self.by_name.get(name).map(|&i| &self.specs[i])
    }

    /// Iterate over all specs in registration order
    pub fn iter(&self) -> impl Iterator<Item = &AgentSpec> {
        self.specs.iter()
    }

    /// Number of registered agents
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_model() -> ModelRef {
        ModelRef {
            kind: ModelKind::Local,
            endpoint: "http://localhost:1234".to_string(),
            model: "llama3.2".to_string(),
            context_window: 8192,
        }
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let mut registry = AgentRegistry::new();
        registry
            .register(AgentSpec::new("api_expert", local_model()))
            .unwrap();
        let err = registry
            .register(AgentSpec::new("api_expert", local_model()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateAgent(name) if name == "api_expert"));
    }

    #[test]
    fn test_resolve_unknown_category() {
        let registry = AgentRegistry::new();
        let err = registry.resolve("standards_check").unwrap_err();
        assert!(matches!(err, Error::NoAgentForCategory(_)));
    }

    #[test]
    fn test_resolve_by_priority() {
        let mut registry = AgentRegistry::new();
        registry
            .register(
                AgentSpec::new("generalist", local_model())
                    .with_capability("code_generation")
                    .with_priority(50),
            )
            .unwrap();
        registry
            .register(
                AgentSpec::new("api_expert", local_model())
                    .with_capability("code_generation")
                    .with_priority(1),
            )
            .unwrap();

        let resolved = registry.resolve("code_generation").unwrap();
        assert_eq!(resolved.name, "api_expert");
    }

    #[test]
    fn test_priority_tie_breaks_by_registration_order() {
        let mut registry = AgentRegistry::new();
        registry
            .register(
                AgentSpec::new("first", local_model())
                    .with_capability("exports")
                    .with_priority(10),
            )
            .unwrap();
        registry
            .register(
                AgentSpec::new("second", local_model())
                    .with_capability("exports")
                    .with_priority(10),
            )
            .unwrap();

        assert_eq!(registry.resolve("exports").unwrap().name, "first");
    }

    #[test]
    fn test_get_by_name() {
        let mut registry = AgentRegistry::new();
        registry
            .register(AgentSpec::new("dynamo", local_model()))
            .unwrap();
        assert!(registry.get("dynamo").is_some());
        assert!(registry.get("missing").is_none());
    }
}
