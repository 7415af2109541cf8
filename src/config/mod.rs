//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `CHAT_RELAY` prefix and nested values use double
//! underscores as separators; the gateway credential additionally falls
//! back to the bare `OPENROUTER_API_KEY` variable.
//!
//! # Example
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod gateway;

pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Text-generation gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `CHAT_RELAY` prefix,
    ///    using `__` to separate nested values
    ///    (`CHAT_RELAY__GATEWAY__MAX_TOKENS=512` -> `gateway.max_tokens`)
    /// 3. Falls back to `OPENROUTER_API_KEY` for the gateway credential
    ///
    /// A missing credential is not an error here; the relay detects it per
    /// request and finalizes with a diagnostic instead.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let mut config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if !config.gateway.has_api_key() {
            config.gateway.api_key = std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.is_empty());
        }

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.gateway.validate()?;
        Ok(())
    }
}
