//! Error types for atelier-core
//!
//! Only configuration-time errors (`DuplicateAgent`, `NoAgentForCategory`,
//! `Config`) and request-level planning errors cross the orchestrator
//! boundary as `Err`. Per-task failures are captured in the task's result.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// An agent with the same name is already registered
    #[error("duplicate agent: {0}")]
    DuplicateAgent(String),

    /// No registered agent declares the capability tag
    #[error("no agent for category: {0}")]
    NoAgentForCategory(String),

    /// Coordinator output or intent template failed task validation
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// The coordination model call itself failed
    #[error("coordination model call failed: {0}")]
    Coordinator(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
