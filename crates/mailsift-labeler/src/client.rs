//! Reasoning service client
//!
//! `ReasoningService` is the seam the generator talks through; the production
//! implementation posts to the Anthropic Messages API. Tests substitute
//! scripted implementations.

use async_trait::async_trait;
use mailsift_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// External reasoning service used to classify message batches
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Send one prompt and return the raw response text.
    ///
    /// Implementations must map transport failures onto the shared error
    /// taxonomy so the retry loop can distinguish transient from permanent
    /// failures.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}

/// Configuration for the Anthropic Messages API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (from the ANTHROPIC_API_KEY environment variable)
    pub api_key: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Response token budget per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds; indefinite blocking is disallowed
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

impl AnthropicConfig {
    /// Config with defaults for everything but the key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Production client for the Anthropic Messages API
pub struct AnthropicClient {
    http: reqwest::Client,
    config: AnthropicConfig,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    /// Build a client with a bounded request timeout
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::config(
                "ANTHROPIC_API_KEY is not set; it is required for label generation",
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ReasoningService for AnthropicClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: system_prompt,
            messages: vec![RequestMessage {
                role: "user",
                content: user_message,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if status.is_server_error() {
            return Err(Error::backend(format!("reasoning service returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::service(format!("{status}: {body}")));
        }

        let parsed: MessagesResponse = response.json().await.map_err(map_transport_error)?;
        let text = parsed
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.clone())
            .ok_or_else(|| Error::malformed("response contained no text content block"))?;

        debug!("Reasoning service returned {} bytes", text.len());
        Ok(text)
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_decode() {
        Error::malformed(format!("undecodable response body: {e}"))
    } else {
        Error::backend(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_config_error() {
        let result = AnthropicClient::new(AnthropicConfig::new(""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn config_defaults() {
        let config = AnthropicConfig::new("key");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.base_url.starts_with("https://"));
    }
}
