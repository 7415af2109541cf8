//! Message entity and its lifecycle state machine.
//!
//! A message is created either as a finished user turn or as an assistant
//! placeholder that accumulates streamed content. The streaming flag is a
//! one-way latch: it starts `true` for placeholders and is cleared by
//! exactly one finalize write, after which the message never changes again.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{ConversationId, MessageId, Timestamp};

/// Role of a message sender within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

/// Lifecycle stage of a message.
///
/// Derived from role, content, and the streaming flag rather than stored,
/// so it can never disagree with the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStage {
    /// User message; terminal from creation.
    Created,
    /// Assistant placeholder, no content yet.
    Pending,
    /// Assistant message accumulating streamed content.
    Streaming,
    /// Assistant message with fixed content; terminal.
    Finalized,
}

/// Errors from message mutation.
#[derive(Debug, Clone, Error)]
pub enum MessageError {
    /// Content writes are only accepted while the streaming latch is open.
    #[error("message {id} is no longer streaming")]
    NotStreaming { id: MessageId },
}

/// A message within a conversation.
///
/// # Invariants
///
/// - `model` is present only on assistant messages
/// - `is_streaming` never transitions back to `true`
/// - content only changes while `is_streaming` is `true`, except for the
///   single finalize write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    role: Role,
    content: String,
    model: Option<String>,
    is_streaming: bool,
    created_at: Timestamp,
}

impl Message {
    /// Creates a finished user message.
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::User,
            content: content.into(),
            model: None,
            is_streaming: false,
            created_at: Timestamp::now(),
        }
    }

    /// Creates an empty assistant placeholder with the streaming latch open.
    pub fn assistant_placeholder(
        conversation_id: ConversationId,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::Assistant,
            content: String::new(),
            model: Some(model.into()),
            is_streaming: true,
            created_at: Timestamp::now(),
        }
    }

    /// Returns the message identifier.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the owning conversation identifier.
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Returns the sender role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the message content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the model that generated this message, for assistant messages.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Returns true while the streaming latch is open.
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// Returns when the message was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns the current lifecycle stage.
    pub fn stage(&self) -> MessageStage {
        match self.role {
            Role::User => MessageStage::Created,
            Role::Assistant if !self.is_streaming => MessageStage::Finalized,
            Role::Assistant if self.content.is_empty() => MessageStage::Pending,
            Role::Assistant => MessageStage::Streaming,
        }
    }

    /// Replaces the content with a newer accumulated version.
    ///
    /// # Errors
    ///
    /// `NotStreaming` if the latch has already been closed.
    pub fn patch_content(&mut self, content: impl Into<String>) -> Result<(), MessageError> {
        if !self.is_streaming {
            return Err(MessageError::NotStreaming { id: self.id });
        }
        self.content = content.into();
        Ok(())
    }

    /// Writes the final content and closes the streaming latch.
    ///
    /// This is the last write for the message; it may replace the content
    /// entirely (the failure paths finalize with a diagnostic instead of the
    /// accumulated text).
    ///
    /// # Errors
    ///
    /// `NotStreaming` if the message was already finalized.
    pub fn finalize(&mut self, content: impl Into<String>) -> Result<(), MessageError> {
        if !self.is_streaming {
            return Err(MessageError::NotStreaming { id: self.id });
        }
        self.content = content.into();
        self.is_streaming = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> ConversationId {
        ConversationId::new()
    }

    #[test]
    fn user_message_is_created_terminal() {
        let msg = Message::user(conversation(), "Hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), "Hello");
        assert!(!msg.is_streaming());
        assert!(msg.model().is_none());
        assert_eq!(msg.stage(), MessageStage::Created);
    }

    #[test]
    fn placeholder_starts_pending() {
        let msg = Message::assistant_placeholder(conversation(), "openai/gpt-4o");
        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.content(), "");
        assert!(msg.is_streaming());
        assert_eq!(msg.model(), Some("openai/gpt-4o"));
        assert_eq!(msg.stage(), MessageStage::Pending);
    }

    #[test]
    fn first_patch_moves_pending_to_streaming() {
        let mut msg = Message::assistant_placeholder(conversation(), "m");
        msg.patch_content("Hi").unwrap();
        assert_eq!(msg.stage(), MessageStage::Streaming);

        msg.patch_content("Hi there").unwrap();
        assert_eq!(msg.content(), "Hi there");
        assert_eq!(msg.stage(), MessageStage::Streaming);
    }

    #[test]
    fn finalize_closes_the_latch() {
        let mut msg = Message::assistant_placeholder(conversation(), "m");
        msg.patch_content("partial").unwrap();
        msg.finalize("full reply").unwrap();

        assert!(!msg.is_streaming());
        assert_eq!(msg.content(), "full reply");
        assert_eq!(msg.stage(), MessageStage::Finalized);
    }

    #[test]
    fn finalize_may_replace_content_entirely() {
        let mut msg = Message::assistant_placeholder(conversation(), "m");
        msg.patch_content("three partial deltas").unwrap();
        msg.finalize("Error: connection reset").unwrap();
        assert_eq!(msg.content(), "Error: connection reset");
    }

    #[test]
    fn patch_after_finalize_is_rejected() {
        let mut msg = Message::assistant_placeholder(conversation(), "m");
        msg.finalize("done").unwrap();

        let err = msg.patch_content("late delta").unwrap_err();
        assert!(matches!(err, MessageError::NotStreaming { .. }));
        assert_eq!(msg.content(), "done");
    }

    #[test]
    fn second_finalize_is_rejected() {
        let mut msg = Message::assistant_placeholder(conversation(), "m");
        msg.finalize("first").unwrap();
        assert!(msg.finalize("second").is_err());
        assert_eq!(msg.content(), "first");
    }

    #[test]
    fn patch_on_user_message_is_rejected() {
        let mut msg = Message::user(conversation(), "Hello");
        assert!(msg.patch_content("edited").is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
