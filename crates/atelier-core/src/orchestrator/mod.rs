//! Orchestrator — request decomposition, scheduling, and assembly
//!
//! # Module Structure
//!
//! - `types`: Request/response types and the overall status
//! - `config`: `OrchestratorConfig`
//! - `core`: Orchestrator struct and builder methods
//! - `plan`: Decomposition (intent templates + coordination model) and validation
//! - `run`: Dependency-aware scheduling with global admission control
//! - `assemble`: Dependency-ordered merge of task results

mod assemble;
mod config;
mod core;
mod plan;
mod run;
mod types;


pub use config::OrchestratorConfig;
pub use core::Orchestrator;
pub use plan::{IntentTemplate, Plan, Planner, TaskTemplate};
pub use types::{OrchestratorRequest, OrchestratorResponse, OverallStatus};
