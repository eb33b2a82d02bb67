//! Atelier core — multi-agent orchestration for design automation.
//!
//! An orchestrator decomposes free-form design-automation requests into
//! dependency-ordered tasks, dispatches them to specialist agents backed by
//! locally hosted models, and assembles the per-task results into one
//! response. Retrieval-augmented agents ground their answers in an engineering
//! standards knowledge store and report citations.
//!
//! ```text
//! request ──> Planner ──> tasks ──> scheduler ──> agents ──> assembly
//!                │                      │            │
//!          coordinator            ResponseCache  KnowledgeStore
//!          (cloud, optional)                     (local only)
//! ```
//!
//! Design data stays on the local network: task agents may only use local
//! models; the cloud coordinator sees instruction text and the agent roster,
//! never model content.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod task;

pub use agent::{Agent, RetrievalAgent, RetrievalConfig, TaskAgent};
pub use cache::{fingerprint, ResponseCache};
pub use config::AtelierConfig;
pub use error::{Error, Result};
pub use orchestrator::{
    IntentTemplate, Orchestrator, OrchestratorConfig, OrchestratorRequest, OrchestratorResponse,
    OverallStatus, Plan, Planner, TaskTemplate,
};
pub use registry::{AgentRegistry, AgentSpec, ModelKind, ModelRef};
pub use task::{Task, TaskError, TaskErrorKind, TaskResult, TaskStatus};
