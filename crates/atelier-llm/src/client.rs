//! Client — the model invocation boundary
//!
//! Defines the request/response types and the `ModelClient` trait that every
//! backing model (local or cloud) implements. Callers hand over already
//! tokenized text; clients hand back text or a structured error.

use crate::error::Result;

/// Request sent across the model invocation boundary
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    /// Prompt text
    pub prompt: String,
    /// Optional system instructions
    pub system: Option<String>,
    /// Max-token budget for the reply
    pub max_tokens: Option<u32>,
}

impl ModelRequest {
    /// Create a new request with a prompt
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set system instructions
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the max-token budget
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a backing model
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// Generated text
    pub text: String,
    /// Model that served the request
    pub model: String,
}

/// Trait for backing model clients
///
/// One instance is bound per agent at startup. `complete` is the single
/// suspension point the orchestrator schedules around; dropping the returned
/// future cancels the underlying transport cooperatively.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Client name (for logs and registry display)
    fn name(&self) -> &str;

    /// Model identifier served by this client
    fn model(&self) -> &str;

    /// Context window size of the backing model, in tokens
    fn context_window(&self) -> u32;

    /// Complete a prompt
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse>;
}
