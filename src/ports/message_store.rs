//! Message Store port - Durable message records.
//!
//! The store provides atomic single-record writes and ordered range reads.
//! Messages are totally ordered per conversation by (creation timestamp,
//! insertion order); `list_messages` returns that canonical order, which is
//! also the order fed back to the gateway as context.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::conversation::{Message, MessageError};
use crate::domain::foundation::{ConversationId, MessageId, ValidationError};

/// Errors from store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The referenced conversation does not exist.
    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),

    /// The referenced message does not exist.
    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    /// A content write arrived after the streaming latch was closed.
    #[error("message {0} is no longer streaming")]
    NotStreaming(MessageId),

    /// A field failed entity validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend failure (connection, I/O, serialization).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<MessageError> for StoreError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::NotStreaming { id } => StoreError::NotStreaming(id),
        }
    }
}

/// Port for durable message storage.
///
/// Write operations are atomic per record; the store has no documented
/// concurrent-write semantics for a single record, so callers serialize
/// writes to the same message.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Writes a finished user message and returns its id.
    async fn create_user_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<MessageId, StoreError>;

    /// Writes an empty assistant placeholder with the streaming latch open.
    async fn create_assistant_message(
        &self,
        conversation_id: ConversationId,
        model: &str,
    ) -> Result<MessageId, StoreError>;

    /// Non-terminal content patch while the message is streaming.
    async fn update_streaming(&self, id: MessageId, content: &str) -> Result<(), StoreError>;

    /// Terminal content patch; closes the streaming latch.
    ///
    /// Exactly one finish write is accepted per message; later attempts
    /// fail with [`StoreError::NotStreaming`].
    async fn finish_streaming(&self, id: MessageId, content: &str) -> Result<(), StoreError>;

    /// Returns the conversation's messages in canonical order.
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError>;
}
