//! Relay handler - the end-to-end streaming turn.
//!
//! One relay turn persists the user message, creates an assistant
//! placeholder, streams the gateway reply into it under throttling, and
//! finalizes the placeholder exactly once. Every failure path ends in that
//! same finalize write: the assistant message's content is the single
//! source of truth for success or failure, and nothing is retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::domain::conversation::assemble;
use crate::domain::foundation::{ConversationId, MessageId};
use crate::ports::{ChatGateway, ChatRequest, GatewayError, MessageStore, StoreError};

/// Finalized content when no gateway credential is configured.
pub const MISSING_CREDENTIAL_DIAGNOSTIC: &str = "Error: OPENROUTER_API_KEY not configured.";

/// Finalized content when a relay is cancelled mid-stream.
pub const CANCELLED_DIAGNOSTIC: &str = "Error: Response cancelled.";

/// Command to relay one user turn through the gateway.
#[derive(Debug, Clone)]
pub struct RelayCommand {
    /// The conversation receiving both messages.
    pub conversation_id: ConversationId,
    /// The user's message content.
    pub content: String,
    /// Gateway model identifier for the assistant reply.
    pub model: String,
}

impl RelayCommand {
    /// Creates a new relay command.
    pub fn new(
        conversation_id: ConversationId,
        content: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            content: content.into(),
            model: model.into(),
        }
    }
}

/// Message ids created by a relay turn.
#[derive(Debug, Clone, Copy)]
pub struct RelayOutcome {
    /// The persisted user message.
    pub user_message_id: MessageId,
    /// The finalized assistant message.
    pub assistant_message_id: MessageId,
}

/// Errors that abort a relay turn.
///
/// Gateway failures never appear here: they finalize the assistant message
/// with a diagnostic instead. Only the relay's own store writes can fail
/// the operation.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration for the relay handler.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Minimum interval between non-terminal content writes.
    pub update_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(100),
        }
    }
}

/// Creates a linked cancel handle/signal pair.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

/// Fires the cancellation of an in-flight relay.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Requests cancellation; idempotent.
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// Signal observed by a cancellable relay.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// Resolves once cancellation has been requested.
    ///
    /// If the handle is dropped without firing, the future never resolves
    /// and the relay simply runs to completion.
    async fn cancelled(&mut self) {
        if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Handler owning the end-to-end relay turn.
///
/// Relays against the same conversation are serialized: the second turn
/// waits for the first to finalize before writing its own messages.
pub struct RelayHandler<G, S>
where
    G: ChatGateway,
    S: MessageStore,
{
    gateway: Arc<G>,
    store: Arc<S>,
    config: RelayConfig,
    /// One turn gate per conversation.
    turns: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<G, S> RelayHandler<G, S>
where
    G: ChatGateway,
    S: MessageStore,
{
    /// Creates a new handler with the given dependencies.
    pub fn new(gateway: Arc<G>, store: Arc<S>) -> Self {
        Self::with_config(gateway, store, RelayConfig::default())
    }

    /// Creates a handler with custom configuration.
    pub fn with_config(gateway: Arc<G>, store: Arc<S>, config: RelayConfig) -> Self {
        Self {
            gateway,
            store,
            config,
            turns: Mutex::new(HashMap::new()),
        }
    }

    /// Relays one user turn; returns once the assistant message is
    /// finalized.
    pub async fn relay(&self, cmd: RelayCommand) -> Result<RelayOutcome, RelayError> {
        self.run(cmd, None).await
    }

    /// Like [`RelayHandler::relay`], but stops reading the stream and
    /// finalizes with a cancellation diagnostic when `cancel` fires.
    pub async fn relay_cancellable(
        &self,
        cmd: RelayCommand,
        cancel: CancelSignal,
    ) -> Result<RelayOutcome, RelayError> {
        self.run(cmd, Some(cancel)).await
    }

    fn turn_gate(&self, conversation_id: ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        let mut turns = self.turns.lock().unwrap();
        Arc::clone(turns.entry(conversation_id).or_default())
    }

    async fn run(
        &self,
        cmd: RelayCommand,
        mut cancel: Option<CancelSignal>,
    ) -> Result<RelayOutcome, RelayError> {
        let gate = self.turn_gate(cmd.conversation_id);
        let _turn = gate.lock().await;

        // The user turn is durable before the placeholder exists.
        let user_message_id = self
            .store
            .create_user_message(cmd.conversation_id, &cmd.content)
            .await?;
        let assistant_message_id = self
            .store
            .create_assistant_message(cmd.conversation_id, &cmd.model)
            .await?;
        let outcome = RelayOutcome {
            user_message_id,
            assistant_message_id,
        };

        let history = self.store.list_messages(cmd.conversation_id).await?;
        let prompt = assemble(&history);

        if !self.gateway.is_configured() {
            tracing::warn!(
                conversation_id = %cmd.conversation_id,
                "No gateway credential configured"
            );
            self.store
                .finish_streaming(assistant_message_id, MISSING_CREDENTIAL_DIAGNOSTIC)
                .await?;
            return Ok(outcome);
        }

        let request = ChatRequest::new(cmd.model.clone(), prompt);
        let mut stream = match self.gateway.open_stream(request).await {
            Ok(stream) => stream,
            Err(GatewayError::Http { status, body }) => {
                tracing::warn!(status, "Gateway rejected completion request");
                let diagnostic = format!(
                    "Error from {} ({}): {}",
                    self.gateway.provider_name(),
                    status,
                    body
                );
                self.store
                    .finish_streaming(assistant_message_id, &diagnostic)
                    .await?;
                return Ok(outcome);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to open gateway stream");
                self.store
                    .finish_streaming(assistant_message_id, &format!("Error: {}", err))
                    .await?;
                return Ok(outcome);
            }
        };

        let mut persister = ThrottledPersister::new(
            self.store.as_ref(),
            assistant_message_id,
            self.config.update_interval,
        );

        loop {
            let next = match cancel.as_mut() {
                Some(signal) => {
                    tokio::select! {
                        _ = signal.cancelled() => {
                            tracing::debug!(
                                message_id = %assistant_message_id,
                                "Relay cancelled mid-stream"
                            );
                            self.store
                                .finish_streaming(assistant_message_id, CANCELLED_DIAGNOSTIC)
                                .await?;
                            return Ok(outcome);
                        }
                        next = stream.next() => next,
                    }
                }
                None => stream.next().await,
            };

            match next {
                Some(Ok(delta)) => {
                    if let Err(err) = persister.push(&delta).await {
                        // A store failure mid-loop follows the stream-failure
                        // contract: the partial reply is discarded.
                        tracing::warn!(error = %err, "Content patch failed mid-stream");
                        self.store
                            .finish_streaming(assistant_message_id, &format!("Error: {}", err))
                            .await?;
                        return Ok(outcome);
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "Gateway stream failed mid-read");
                    self.store
                        .finish_streaming(assistant_message_id, &format!("Error: {}", err))
                        .await?;
                    return Ok(outcome);
                }
                None => break,
            }
        }

        let content = persister.into_content();
        self.store
            .finish_streaming(assistant_message_id, &content)
            .await?;
        tracing::debug!(
            message_id = %assistant_message_id,
            chars = content.len(),
            "Relay turn finalized"
        );
        Ok(outcome)
    }
}

/// Coalesces streamed deltas into bounded-rate content writes.
///
/// The full reply so far accumulates in one buffer; a write goes out only
/// when at least the configured interval has elapsed since the previous
/// one (the first delta always writes). Skipped writes lose nothing: the
/// next write carries the complete buffer. Writes are awaited one at a
/// time, never overlapping for the same message.
pub struct ThrottledPersister<'a, S>
where
    S: MessageStore + ?Sized,
{
    store: &'a S,
    message_id: MessageId,
    interval: Duration,
    content: String,
    last_write: Option<Instant>,
}

impl<'a, S> ThrottledPersister<'a, S>
where
    S: MessageStore + ?Sized,
{
    /// Creates a persister for one assistant message.
    pub fn new(store: &'a S, message_id: MessageId, interval: Duration) -> Self {
        Self {
            store,
            message_id,
            interval,
            content: String::new(),
            last_write: None,
        }
    }

    /// Appends one delta and writes the buffer if the interval allows.
    pub async fn push(&mut self, delta: &str) -> Result<(), StoreError> {
        self.content.push_str(delta);

        let now = Instant::now();
        let due = self
            .last_write
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.store
                .update_streaming(self.message_id, &self.content)
                .await?;
            self.last_write = Some(now);
        }
        Ok(())
    }

    /// Returns the accumulated reply so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consumes the persister, returning the full accumulated reply for
    /// the terminal write.
    pub fn into_content(self) -> String {
        self.content
    }
}
