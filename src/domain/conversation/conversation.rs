//! Conversation entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, Timestamp, ValidationError};

/// A conversation: a titled, ordered log of messages tied to a selected model.
///
/// The store owns the message log itself; this entity carries only the
/// conversation-level fields, mutated by title and model updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    title: String,
    model: String,
    created_at: Timestamp,
}

impl Conversation {
    /// Creates a new conversation.
    ///
    /// # Errors
    ///
    /// `EmptyField` if the title or model identifier is empty.
    pub fn new(title: impl Into<String>, model: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        let model = model.into();
        if model.is_empty() {
            return Err(ValidationError::empty_field("model"));
        }
        Ok(Self {
            id: ConversationId::new(),
            title,
            model,
            created_at: Timestamp::now(),
        })
    }

    /// Returns the conversation identifier.
    pub fn id(&self) -> ConversationId {
        self.id
    }

    /// Returns the conversation title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the currently selected model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns when the conversation was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Renames the conversation.
    pub fn rename(&mut self, title: impl Into<String>) -> Result<(), ValidationError> {
        let title = title.into();
        if title.is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        self.title = title;
        Ok(())
    }

    /// Switches the selected model for future turns.
    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), ValidationError> {
        let model = model.into();
        if model.is_empty() {
            return Err(ValidationError::empty_field("model"));
        }
        self.model = model;
        Ok(())
    }
}
