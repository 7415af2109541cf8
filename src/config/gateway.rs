//! Gateway configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Text-generation gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// API key; absent is valid and handled by the relay as a terminal
    /// diagnostic, never a process failure
    pub api_key: Option<String>,

    /// Base URL of the chat-completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Token cap applied to every completion request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Connect timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Minimum interval between non-terminal content writes, in milliseconds
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u64,
}

impl GatewayConfig {
    /// Get the content-write throttle interval as a Duration
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.max_tokens == 0 {
            return Err(ValidationError::InvalidMaxTokens);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            update_interval_ms: default_update_interval(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout() -> u64 {
    30
}

fn default_update_interval() -> u64 {
    100
}
