//! Cloud — Anthropic Messages API provider
//!
//! The only cloud-backed client in the system. The privacy constraint is
//! enforced upstream at configuration time: this client is bound exclusively
//! to the orchestrator's coordination role, never to a domain agent, so the
//! only text that reaches it is the user's instruction and the agent roster.

use crate::client::{ModelClient, ModelRequest, ModelResponse};
use crate::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default Anthropic API URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value
const API_VERSION: &str = "2023-06-01";

/// Default coordination model
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Cloud client configuration
#[derive(Clone)]
pub struct CloudClientConfig {
    /// Base URL (default: Anthropic API)
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Context window size of the backing model
    pub context_window: u32,
    /// Default max tokens per reply
    pub default_max_tokens: u32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CloudClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            context_window: 200_000,
            default_max_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }
}

impl CloudClientConfig {
    /// Create a configuration with an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model identifier
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
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

// The key never appears in logs or debug output
impl std::fmt::Debug for CloudClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("context_window", &self.context_window)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Anthropic Messages API client
pub struct CloudClient {
    client: Client,
    config: CloudClientConfig,
}

impl std::fmt::Debug for CloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CloudClient {
    /// Create a new cloud client
    pub fn new(config: CloudClientConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::NotConfigured("cloud api key".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn send_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/v1/messages", self.config.base_url);

        debug!(model = %request.model, "Sending request to cloud endpoint");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::Unavailable(format!("failed to connect to {}", self.config.base_url))
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
                // Server-side unavailability is distinct from a model decline
                if status.is_server_error() || error.error.kind == "overloaded_error" {
                    return Err(Error::Unavailable(error.error.message));
                }
                return Err(Error::Refusal(error.error.message));
            }
            if status.is_server_error() {
                return Err(Error::Unavailable(format!("HTTP {status}")));
            }
            return Err(Error::Refusal(format!("HTTP {status}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Refusal(format!("malformed messages payload: {e}")))
    }
}

#[async_trait::async_trait]
impl ModelClient for CloudClient {
    fn name(&self) -> &str {
        "cloud"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn context_window(&self) -> u32 {
        self.config.context_window
    }

    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
        let api_request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: request
                .max_tokens
                .unwrap_or(self.config.default_max_tokens),
            system: request.system.clone(),
            messages: vec![ApiMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
        };

        let response = self.send_request(api_request).await?;

        let text: String = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(Error::Refusal("empty completion content".to_string()));
        }

        Ok(ModelResponse {
            text,
            model: response.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CloudClientConfig::new("sk-test")
            .with_model("claude-3-5-sonnet-20241022")
            .with_max_tokens(4096)
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.default_max_tokens, 4096);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_missing_api_key_is_not_configured() {
        let err = CloudClient::new(CloudClientConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = CloudClient::new(CloudClientConfig::new("sk-secret-123")).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-secret-123"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_error_payload_parsing() {
        let parsed: ApiError = serde_json::from_str(
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad prompt"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.error.kind, "invalid_request_error");
        assert_eq!(parsed.error.message, "bad prompt");
    }
}
