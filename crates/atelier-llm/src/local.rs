//! Local — OpenAI-compatible local endpoint provider
//!
//! Talks to a locally hosted inference server (LM Studio, Ollama in
//! OpenAI-compat mode, llama.cpp server) over `/v1/chat/completions`.
//! Project data sent to these clients never leaves the user's machine.

use crate::client::{ModelClient, ModelRequest, ModelResponse};
use crate::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default local endpoint (LM Studio convention)
const DEFAULT_BASE_URL: &str = "http://localhost:1234";

/// Default context window when the server does not report one
const DEFAULT_CONTEXT_WINDOW: u32 = 8192;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorBody {
    Message(String),
    Object {
        message: String,
    },
}

impl ApiErrorBody {
    fn message(&self) -> &str {
        match self {
            Self::Message(m) | Self::Object { message: m } => m,
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Local client configuration
#[derive(Debug, Clone)]
pub struct LocalClientConfig {
    /// Base URL (default: <http://localhost:1234>)
    pub base_url: String,
    /// Model identifier to request
    pub model: String,
    /// Context window size of the backing model
    pub context_window: u32,
    /// Default max tokens per reply
    pub default_max_tokens: u32,
    /// Request timeout (longer for local inference)
    pub timeout: Duration,
}

impl Default for LocalClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: String::new(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            default_max_tokens: 2048,
            timeout: Duration::from_secs(120),
        }
    }
}

impl LocalClientConfig {
    /// Create a configuration for a given model
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the context window size
    #[must_use]
    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    /// Set the default max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible local model client
pub struct LocalClient {
    client: Client,
    config: LocalClientConfig,
}

impl std::fmt::Debug for LocalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LocalClient {
    /// Create a new local client
    pub fn new(config: LocalClientConfig) -> Result<Self> {
        if config.model.is_empty() {
            return Err(Error::NotConfigured("local model identifier".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Check if the local endpoint is responsive
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn build_messages(request: &ModelRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });
        messages
    }

    async fn send_request(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        debug!(model = %request.model, "Sending request to local endpoint");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::Unavailable(format!(
                        "failed to connect to {}. Is the local server running?",
                        self.config.base_url
                    ))
                } else if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
                return Err(Error::Refusal(error.error.message().to_string()));
            }
            return Err(Error::Refusal(format!("HTTP {status}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Refusal(format!("malformed completion payload: {e}")))
    }
}

#[async_trait::async_trait]
impl ModelClient for LocalClient {
    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn context_window(&self) -> u32 {
        self.config.context_window
    }

    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
        let chat_request = ChatRequest {
            model: self.config.model.clone(),
            messages: Self::build_messages(&request),
            max_tokens: request
                .max_tokens
                .or(Some(self.config.default_max_tokens)),
            stream: false,
        };

        let response = self.send_request(chat_request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Refusal("empty choices in completion".to_string()))?;

        Ok(ModelResponse {
            text: choice.message.content,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LocalClientConfig::new("mixtral-8x7b-instruct")
            .with_base_url("http://localhost:1236")
            .with_context_window(32768)
            .with_max_tokens(1024)
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.model, "mixtral-8x7b-instruct");
        assert_eq!(config.base_url, "http://localhost:1236");
        assert_eq!(config.context_window, 32768);
        assert_eq!(config.default_max_tokens, 1024);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_model_is_not_configured() {
        let err = LocalClient::new(LocalClientConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn test_client_is_debuggable() {
        let client = LocalClient::new(LocalClientConfig::new("llama3.2")).unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("llama3.2"));
    }

    #[test]
    fn test_message_building() {
        let request = ModelRequest::new("hello").with_system("be terse");
        let messages = LocalClient::build_messages(&request);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_error_body_variants() {
        let object: ApiError =
            serde_json::from_str(r#"{"error":{"message":"model not loaded"}}"#).unwrap();
        assert_eq!(object.error.message(), "model not loaded");

        let plain: ApiError = serde_json::from_str(r#"{"error":"overloaded"}"#).unwrap();
        assert_eq!(plain.error.message(), "overloaded");
    }
}
