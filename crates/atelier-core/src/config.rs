//! TOML configuration for the whole runtime.
//!
//! One file declares the orchestrator tunables, the optional coordination
//! model, the knowledge store, every agent, and the intent templates.
//! Unknown keys are rejected so typos fail loudly at startup.
//!
//! ```toml
//! [orchestrator]
//! max_concurrent_agents = 4
//!
//! [coordinator]
//! model = "claude-3-opus-20240229"
//!
//! [[agents]]
//! name = "standards"
//! kind = "local"
//! endpoint = "http://localhost:1234"
//! model = "llama3.2"
//! capabilities = ["standards_check"]
//! retrieval = true
//! ```

use crate::agent::{Agent, RetrievalAgent, RetrievalConfig, TaskAgent};
use crate::error::{Error, Result};
use crate::orchestrator::{IntentTemplate, OrchestratorConfig, Planner};
use crate::registry::{AgentRegistry, AgentSpec, ModelKind, ModelRef};
use atelier_knowledge::{ChunkingConfig, KnowledgeStore};
use atelier_llm::{CloudClient, CloudClientConfig, LocalClient, LocalClientConfig, ModelClient};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Top-level configuration file shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtelierConfig {
    /// Orchestrator tunables
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    /// Coordination model; omit to plan with intent templates only
    #[serde(default)]
    pub coordinator: Option<CoordinatorSection>,
    /// Knowledge store settings
    #[serde(default)]
    pub knowledge: KnowledgeSection,
    /// Agent declarations
    #[serde(default)]
    pub agents: Vec<AgentSection>,
    /// Intent templates, matched in declaration order
    #[serde(default)]
    pub intents: Vec<IntentTemplate>,
}

/// `[orchestrator]` section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorSection {
    /// Global cap on concurrently running agent invocations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_agents: usize,
    /// Default per-task deadline in seconds
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,
    /// Cache time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Category for passthrough tasks
    #[serde(default = "default_category")]
    pub default_category: String,
}

/// `[coordinator]` section — the only place a cloud model is allowed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorSection {
    /// Cloud model identifier
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Maximum tokens per coordination answer
    #[serde(default = "default_coordinator_max_tokens")]
    pub max_tokens: u32,
}

/// `[knowledge]` section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeSection {
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between neighboring chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Maximum passages retrieved per task
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    /// Minimum similarity score for a passage to be used
    #[serde(default = "default_retrieval_min_score")]
    pub retrieval_min_score: f32,
}

/// One `[[agents]]` entry
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    /// Unique agent name
    pub name: String,
    /// Where the backing model runs
    pub kind: ModelKind,
    /// Endpoint URL
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Context window size in tokens
    #[serde(default = "default_context_window")]
    pub context_window: u32,
    /// Capability tags
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Whether the agent grounds answers in the knowledge store
    #[serde(default)]
    pub retrieval: bool,
    /// Resolution priority, lower wins
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Capability summary for the coordinator roster
    #[serde(default)]
    pub description: String,
    /// System instructions sent with every task
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl AgentSection {
    /// The immutable spec this entry registers
    #[must_use]
    pub fn spec(&self) -> AgentSpec {
        let mut spec = AgentSpec::new(
            self.name.clone(),
            ModelRef {
                kind: self.kind,
                endpoint: self.endpoint.clone(),
                model: self.model.clone(),
                context_window: self.context_window,
            },
        )
        .with_retrieval(self.retrieval)
        .with_priority(self.priority)
        .with_description(self.description.clone());
        for capability in &self.capabilities {
            spec = spec.with_capability(capability.clone());
        }
        spec
    }
}

fn default_max_concurrent() -> usize {
    4
}
fn default_agent_timeout_secs() -> u64 {
    120
}
fn default_cache_ttl_secs() -> u64 {
    900
}
fn default_category() -> String {
    "general".to_string()
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_coordinator_max_tokens() -> u32 {
    4096
}
fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    160
}
fn default_retrieval_k() -> usize {
    5
}
fn default_retrieval_min_score() -> f32 {
    0.25
}
fn default_context_window() -> u32 {
    8192
}
fn default_priority() -> u32 {
    100
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_concurrent_agents: default_max_concurrent(),
            agent_timeout_secs: default_agent_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            default_category: default_category(),
        }
    }
}

impl Default for KnowledgeSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            retrieval_k: default_retrieval_k(),
            retrieval_min_score: default_retrieval_min_score(),
        }
    }
}

impl AtelierConfig {
    /// Parse and validate a TOML string
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse, and validate a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), agents = config.agents.len(), "Configuration loaded");
        Ok(config)
    }

    /// Structural checks beyond what deserialization enforces.
    ///
    /// Design data never leaves the local network through task agents: cloud
    /// models are valid only in the `[coordinator]` section, which sees the
    /// instruction text and agent roster but no model content.
    fn validate(&self) -> Result<()> {
        for agent in &self.agents {
            if agent.kind == ModelKind::Cloud {
                return Err(Error::Config(format!(
                    "agent '{}' uses a cloud model; cloud models are reserved \
                     for the coordinator",
                    agent.name
                )));
            }
        }
        self.chunking()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    /// Build the agent registry from the `[[agents]]` entries
    pub fn registry(&self) -> Result<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        for agent in &self.agents {
            registry.register(agent.spec())?;
        }
        Ok(registry)
    }

    /// Build the runtime agents declared by the `[[agents]]` entries.
    ///
    /// Each entry gets a local model client; retrieval entries are bound to
    /// the given knowledge store. System prompts from the file are attached
    /// here. Pass the result to `Orchestrator::with_agent`.
    pub fn agents(&self, store: &Arc<KnowledgeStore>) -> Result<Vec<Arc<dyn Agent>>> {
        let retrieval = self.retrieval();
        let mut agents: Vec<Arc<dyn Agent>> = Vec::with_capacity(self.agents.len());
        for section in &self.agents {
            let client: Arc<dyn ModelClient> = Arc::new(
                LocalClient::new(
                    LocalClientConfig::new(section.model.clone())
                        .with_base_url(section.endpoint.clone())
                        .with_context_window(section.context_window),
                )
                .map_err(|e| Error::Config(format!("agent '{}': {e}", section.name)))?,
            );

            let agent: Arc<dyn Agent> = if section.retrieval {
                let mut agent = RetrievalAgent::new(
                    section.spec(),
                    client,
                    Arc::clone(store),
                    retrieval.clone(),
                );
                if let Some(prompt) = &section.system_prompt {
                    agent = agent.with_system_prompt(prompt.clone());
                }
                Arc::new(agent)
            } else {
                let mut agent = TaskAgent::new(section.spec(), client);
                if let Some(prompt) = &section.system_prompt {
                    agent = agent.with_system_prompt(prompt.clone());
                }
                Arc::new(agent)
            };
            agents.push(agent);
        }
        Ok(agents)
    }

    /// Orchestrator tunables as a runtime config
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_max_concurrent_agents(self.orchestrator.max_concurrent_agents)
            .with_agent_timeout(Duration::from_secs(self.orchestrator.agent_timeout_secs))
            .with_cache_ttl(Duration::from_secs(self.orchestrator.cache_ttl_secs))
            .with_default_category(self.orchestrator.default_category.clone())
    }

    /// Knowledge store chunking parameters
    #[must_use]
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.knowledge.chunk_size,
            chunk_overlap: self.knowledge.chunk_overlap,
        }
    }

    /// Retrieval parameters for retrieval-augmented agents
    #[must_use]
    pub fn retrieval(&self) -> RetrievalConfig {
        RetrievalConfig {
            k: self.knowledge.retrieval_k,
            min_score: self.knowledge.retrieval_min_score,
        }
    }

    /// Build the coordination model client, when one is configured.
    ///
    /// The API key is read from the environment variable named in the
    /// `[coordinator]` section, never from the file itself.
    pub fn coordinator_client(&self) -> Result<Option<CloudClient>> {
        let Some(section) = &self.coordinator else {
            return Ok(None);
        };
        let api_key = std::env::var(&section.api_key_env).map_err(|_| {
            Error::Config(format!(
                "environment variable {} is not set",
                section.api_key_env
            ))
        })?;
        let client = CloudClient::new(
            CloudClientConfig::new(api_key)
                .with_model(section.model.clone())
                .with_max_tokens(section.max_tokens),
        )
        .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Some(client))
    }

    /// Assemble the planner from the intent templates, the default category,
    /// and the coordinator (when configured).
    pub fn planner(&self) -> Result<Planner> {
        let mut planner = Planner::new(self.orchestrator.default_category.clone())
            .with_templates(self.intents.clone());
        if let Some(client) = self.coordinator_client()? {
            planner = planner.with_coordinator(Arc::new(client));
        }
        Ok(planner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_llm::HashEmbedder;

    const MINIMAL: &str = r#"
        [[agents]]
        name = "api_expert"
        kind = "local"
        endpoint = "http://localhost:1234"
        model = "llama3.2"
        capabilities = ["code_generation", "general"]
    "#;

    #[test]
    fn test_minimal_config() {
        let config = AtelierConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.orchestrator.max_concurrent_agents, 4);
        assert!(config.coordinator.is_none());
        assert!(config.coordinator_client().unwrap().is_none());
        assert!(config.planner().is_ok());

        let registry = config.registry().unwrap();
        assert_eq!(registry.resolve("general").unwrap().name, "api_expert");
    }

    #[test]
    fn test_agents_built_from_config() {
        let raw = r#"
            [[agents]]
            name = "api_expert"
            kind = "local"
            endpoint = "http://localhost:1234"
            model = "llama3.2"
            capabilities = ["code_generation"]
            system_prompt = "You write CAD automation code."

            [[agents]]
            name = "standards"
            kind = "local"
            endpoint = "http://localhost:1234"
            model = "llama3.2"
            capabilities = ["standards_check"]
            retrieval = true
        "#;
        let config = AtelierConfig::from_toml_str(raw).unwrap();
        let store = Arc::new(
            KnowledgeStore::new(Arc::new(HashEmbedder::default()), config.chunking()).unwrap(),
        );

        let agents = config.agents(&store).unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].name(), "api_expert");
        assert!(!agents[0].retrieval_enabled());
        assert_eq!(
            agents[0].system_prompt(),
            Some("You write CAD automation code.")
        );
        assert!(agents[1].retrieval_enabled());
        assert!(agents[1].system_prompt().is_none());
    }

    #[test]
    fn test_cloud_agent_rejected() {
        let raw = r#"
            [[agents]]
            name = "leaky"
            kind = "cloud"
            endpoint = "https://api.anthropic.com"
            model = "claude-3-opus-20240229"
        "#;
        let err = AtelierConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("cloud")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let raw = r#"
            [orchestrator]
            max_concurent_agents = 4
        "#;
        assert!(matches!(
            AtelierConfig::from_toml_str(raw),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_bad_chunking_rejected() {
        let raw = r#"
            [knowledge]
            chunk_size = 100
            chunk_overlap = 100
        "#;
        assert!(matches!(
            AtelierConfig::from_toml_str(raw),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            [orchestrator]
            max_concurrent_agents = 2
            agent_timeout_secs = 30
            cache_ttl_secs = 60
            default_category = "general"

            [coordinator]
            model = "claude-3-opus-20240229"

            [knowledge]
            chunk_size = 400
            chunk_overlap = 80
            retrieval_k = 3
            retrieval_min_score = 0.4

            [[agents]]
            name = "standards"
            kind = "local"
            endpoint = "http://localhost:1234"
            model = "llama3.2"
            capabilities = ["standards_check"]
            retrieval = true
            priority = 1
            description = "ASHRAE and BICSI lookups"

            [[intents]]
            name = "compliant_generation"
            triggers = ["compliant"]

            [[intents.tasks]]
            id = "check"
            category = "standards_check"
            input = "Check standards for: {instruction}"
        "#;
        let config = AtelierConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.orchestrator_config().max_concurrent_agents, 2);
        assert_eq!(config.coordinator.as_ref().unwrap().api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.intents.len(), 1);
        assert_eq!(config.chunking().chunk_size, 400);
        assert_eq!(config.retrieval().k, 3);
        assert!(config.registry().unwrap().get("standards").unwrap().retrieval);
    }
}
