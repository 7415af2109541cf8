//! Conversation Store port - Conversation-level CRUD.

use async_trait::async_trait;

use super::message_store::StoreError;
use crate::domain::conversation::Conversation;
use crate::domain::foundation::ConversationId;

/// Port for conversation records.
///
/// Conversations are mutated only by title and model updates; removal
/// cascades to the conversation's messages.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates a conversation and returns its id.
    async fn create_conversation(
        &self,
        title: &str,
        model: &str,
    ) -> Result<ConversationId, StoreError>;

    /// Fetches a single conversation, if it exists.
    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Lists all conversations, newest first.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError>;

    /// Renames a conversation.
    async fn update_title(&self, id: ConversationId, title: &str) -> Result<(), StoreError>;

    /// Switches the conversation's selected model.
    async fn update_model(&self, id: ConversationId, model: &str) -> Result<(), StoreError>;

    /// Removes a conversation and all of its messages.
    async fn remove_conversation(&self, id: ConversationId) -> Result<(), StoreError>;
}
