//! OpenRouter gateway adapter.
//!
//! Implements the ChatGateway port against OpenRouter's chat-completions
//! API. Requests are always streaming (`stream: true`); the response body
//! is decoded by [`super::sse`].
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenRouterConfig::new(Some(api_key))
//!     .with_base_url("https://openrouter.ai/api/v1");
//!
//! let gateway = OpenRouterGateway::new(config);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;

use super::sse::delta_stream;
use crate::config::GatewayConfig;
use crate::domain::conversation::PromptMessage;
use crate::ports::{ChatGateway, ChatRequest, DeltaStream, GatewayError};

/// Configuration for the OpenRouter gateway.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// API key for authentication; absence is a valid, detectable state.
    api_key: Option<Secret<String>>,
    /// Base URL for the API.
    pub base_url: String,
    /// Token cap applied to every completion request.
    pub max_tokens: u32,
    /// Connect timeout for the HTTP client.
    pub connect_timeout: Duration,
}

impl OpenRouterConfig {
    /// Creates a new configuration with the given (optional) API key.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(Secret::new),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            max_tokens: 512,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Builds the adapter configuration from the application config.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            api_key: config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .map(Secret::new),
            base_url: config.base_url.clone(),
            max_tokens: config.max_tokens,
            connect_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the per-request token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }
}

/// OpenRouter API gateway implementation.
pub struct OpenRouterGateway {
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterGateway {
    /// Creates a new gateway with the given configuration.
    pub fn new(config: OpenRouterConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl ChatGateway for OpenRouterGateway {
    fn provider_name(&self) -> &str {
        "OpenRouter"
    }

    fn is_configured(&self) -> bool {
        self.config.api_key().is_some()
    }

    async fn open_stream(&self, request: ChatRequest) -> Result<DeltaStream, GatewayError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| GatewayError::network("no API key configured"))?;

        let body = CompletionsBody {
            model: &request.model,
            messages: &request.messages,
            stream: true,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Gateway request rejected");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(model = %request.model, "Opened gateway stream");
        Ok(Box::pin(delta_stream(response.bytes_stream())))
    }
}

/// Wire body of a streaming completion request.
#[derive(Debug, Serialize)]
struct CompletionsBody<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    max_tokens: u32,
}
