//! Chat Gateway port - Streaming completions from the text-generation gateway.
//!
//! The gateway is an explicit dependency injected into the relay handler,
//! not ambient global state. A request opens one streaming completion; the
//! response is consumed as an ordered, finite stream of text deltas.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::conversation::PromptMessage;

/// Ordered text deltas decoded from one streaming completion.
///
/// The stream is finite: it ends when the gateway signals completion or the
/// transport ends. A transport failure yields one `Err` item and then ends;
/// content yielded before the failure is the caller's to keep or discard.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

/// A streaming completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Gateway model identifier.
    pub model: String,
    /// Prompt history, oldest first.
    pub messages: Vec<PromptMessage>,
}

impl ChatRequest {
    /// Creates a new request.
    pub fn new(model: impl Into<String>, messages: Vec<PromptMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }
}

/// Gateway errors.
///
/// None of these are retried by the relay; each maps to a terminal
/// diagnostic written into the assistant message.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway answered with a non-success HTTP status.
    #[error("gateway returned {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The request could not be sent.
    #[error("network error: {0}")]
    Network(String),

    /// The response stream failed mid-read.
    #[error("stream error: {0}")]
    Stream(String),
}

impl GatewayError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }
}

/// Port for the streaming text-generation gateway.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Gateway display name, used in user-facing diagnostics.
    fn provider_name(&self) -> &str;

    /// Returns true when a credential is configured.
    ///
    /// When false, callers must not issue requests; the relay finalizes
    /// with a fixed diagnostic instead.
    fn is_configured(&self) -> bool;

    /// Opens a streaming completion.
    ///
    /// # Errors
    ///
    /// - `Http` for a non-success response status
    /// - `Network` if the request cannot be sent
    async fn open_stream(&self, request: ChatRequest) -> Result<DeltaStream, GatewayError>;
}
