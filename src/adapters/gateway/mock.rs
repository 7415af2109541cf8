//! Mock Chat Gateway for testing.
//!
//! Provides a configurable mock implementation of the ChatGateway port,
//! allowing tests to run without a network or a real API key.
//!
//! # Features
//!
//! - Scripted delta streams (consumed in order, one per `open_stream`)
//! - HTTP and mid-stream error injection
//! - Optional per-delta delay to exercise throttling
//! - Call recording for verification
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockChatGateway::new()
//!     .with_deltas(["Hi", " there"]);
//!
//! let handler = RelayHandler::new(Arc::new(gateway), store);
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ports::{ChatGateway, ChatRequest, DeltaStream, GatewayError};

/// A scripted gateway response.
#[derive(Debug, Clone)]
pub enum MockStream {
    /// Yield these deltas, then end normally.
    Deltas(Vec<String>),
    /// Yield these deltas, then fail mid-stream.
    DeltasThenError(Vec<String>, String),
    /// Reject the request with an HTTP error before any delta.
    Http { status: u16, body: String },
    /// Fail to send the request at all.
    Network(String),
}

/// Mock gateway for testing.
#[derive(Debug, Clone)]
pub struct MockChatGateway {
    /// Scripted responses (consumed in order).
    scripts: Arc<Mutex<VecDeque<MockStream>>>,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<ChatRequest>>>,
    /// Whether a credential is "configured".
    configured: bool,
    /// Simulated gap between deltas.
    delta_delay: Duration,
}

impl Default for MockChatGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatGateway {
    /// Creates a configured mock with no scripted responses.
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            configured: true,
            delta_delay: Duration::ZERO,
        }
    }

    /// Makes the mock report no configured credential.
    pub fn without_credential(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Queues a normal delta sequence.
    pub fn with_deltas<I, T>(self, deltas: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.with_script(MockStream::Deltas(
            deltas.into_iter().map(Into::into).collect(),
        ))
    }

    /// Queues a delta sequence that fails mid-stream.
    pub fn with_stream_failure<I, T>(self, deltas: I, error: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.with_script(MockStream::DeltasThenError(
            deltas.into_iter().map(Into::into).collect(),
            error.into(),
        ))
    }

    /// Queues an HTTP rejection.
    pub fn with_http_error(self, status: u16, body: impl Into<String>) -> Self {
        self.with_script(MockStream::Http {
            status,
            body: body.into(),
        })
    }

    /// Queues a request send failure.
    pub fn with_network_error(self, message: impl Into<String>) -> Self {
        self.with_script(MockStream::Network(message.into()))
    }

    /// Queues an arbitrary scripted response.
    pub fn with_script(self, script: MockStream) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    /// Sets the simulated gap before each delta.
    pub fn with_delta_delay(mut self, delay: Duration) -> Self {
        self.delta_delay = delay;
        self
    }

    /// Returns the number of `open_stream` calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns the recorded requests.
    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for MockChatGateway {
    fn provider_name(&self) -> &str {
        "OpenRouter"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn open_stream(&self, request: ChatRequest) -> Result<DeltaStream, GatewayError> {
        self.calls.lock().unwrap().push(request);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockStream::Deltas(Vec::new()));

        let items: Vec<Result<String, GatewayError>> = match script {
            MockStream::Deltas(deltas) => deltas.into_iter().map(Ok).collect(),
            MockStream::DeltasThenError(deltas, error) => deltas
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(GatewayError::stream(error))))
                .collect(),
            MockStream::Http { status, body } => {
                return Err(GatewayError::Http { status, body });
            }
            MockStream::Network(message) => {
                return Err(GatewayError::network(message));
            }
        };

        let delay = self.delta_delay;
        let stream = stream::iter(items).then(move |item| async move {
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            item
        });

        Ok(Box::pin(stream))
    }
}
