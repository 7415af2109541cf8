//! In-Memory Message Store Adapter
//!
//! Stores conversations and their message logs in memory and pushes the
//! full ordered message list to subscribers after every change. Useful for
//! testing and development; the durable engine behind the store ports is
//! expected to be provided by the deployment.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::domain::conversation::{Conversation, Message};
use crate::domain::foundation::{ConversationId, MessageId};
use crate::ports::{
    ConversationStore, MessageFeed, MessageStore, StoreError, Subscription, UpdateListener,
};

/// In-memory store for conversations and messages.
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<RwLock<StoreInner>>,
    listeners: Arc<Mutex<ListenerRegistry>>,
}

#[derive(Default)]
struct StoreInner {
    /// Conversations in creation order.
    conversations: Vec<Conversation>,
    /// Message logs in canonical (creation, insertion) order.
    messages: HashMap<ConversationId, Vec<Message>>,
    /// Reverse index from message to owning conversation.
    locations: HashMap<MessageId, ConversationId>,
}

#[derive(Default)]
struct ListenerRegistry {
    next_token: u64,
    by_conversation: HashMap<ConversationId, Vec<(u64, Arc<dyn UpdateListener>)>>,
}

impl InMemoryMessageStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all stored data (useful for tests).
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.conversations.clear();
        inner.messages.clear();
        inner.locations.clear();
    }

    /// Returns the number of stored conversations.
    pub async fn conversation_count(&self) -> usize {
        self.inner.read().await.conversations.len()
    }

    /// Pushes the conversation's current log to its subscribers.
    fn notify(&self, conversation_id: ConversationId, messages: &[Message]) {
        let subscribers: Vec<Arc<dyn UpdateListener>> = {
            let registry = self.listeners.lock().unwrap();
            registry
                .by_conversation
                .get(&conversation_id)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };
        for listener in subscribers {
            listener.on_update(conversation_id, messages);
        }
    }

    /// Appends a message and notifies subscribers.
    async fn append_message(&self, message: Message) -> Result<MessageId, StoreError> {
        let conversation_id = message.conversation_id();
        let id = message.id();
        let snapshot = {
            let mut inner = self.inner.write().await;
            if !inner
                .conversations
                .iter()
                .any(|c| c.id() == conversation_id)
            {
                return Err(StoreError::ConversationNotFound(conversation_id));
            }
            inner.locations.insert(id, conversation_id);
            let log = inner.messages.entry(conversation_id).or_default();
            log.push(message);
            log.clone()
        };
        self.notify(conversation_id, &snapshot);
        Ok(id)
    }

    /// Applies a mutation to one message and notifies subscribers.
    async fn patch_message<F>(&self, id: MessageId, patch: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Message) -> Result<(), StoreError>,
    {
        let (conversation_id, snapshot) = {
            let mut inner = self.inner.write().await;
            let conversation_id = *inner
                .locations
                .get(&id)
                .ok_or(StoreError::MessageNotFound(id))?;
            let log = inner
                .messages
                .get_mut(&conversation_id)
                .ok_or(StoreError::MessageNotFound(id))?;
            let message = log
                .iter_mut()
                .find(|m| m.id() == id)
                .ok_or(StoreError::MessageNotFound(id))?;
            patch(message)?;
            (conversation_id, log.clone())
        };
        self.notify(conversation_id, &snapshot);
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryMessageStore {
    async fn create_conversation(
        &self,
        title: &str,
        model: &str,
    ) -> Result<ConversationId, StoreError> {
        let conversation = Conversation::new(title, model)?;
        let id = conversation.id();
        self.inner.write().await.conversations.push(conversation);
        tracing::debug!(conversation_id = %id, "Created conversation");
        Ok(id)
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.conversations.iter().find(|c| c.id() == id).cloned())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.conversations.iter().rev().cloned().collect())
    }

    async fn update_title(&self, id: ConversationId, title: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(StoreError::ConversationNotFound(id))?;
        conversation.rename(title)?;
        Ok(())
    }

    async fn update_model(&self, id: ConversationId, model: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(StoreError::ConversationNotFound(id))?;
        conversation.set_model(model)?;
        Ok(())
    }

    async fn remove_conversation(&self, id: ConversationId) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.write().await;
            let position = inner
                .conversations
                .iter()
                .position(|c| c.id() == id)
                .ok_or(StoreError::ConversationNotFound(id))?;
            inner.conversations.remove(position);
            // Cascade: drop the log and its index entries.
            if let Some(log) = inner.messages.remove(&id) {
                for message in &log {
                    inner.locations.remove(&message.id());
                }
            }
        }
        self.notify(id, &[]);
        tracing::debug!(conversation_id = %id, "Removed conversation");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create_user_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<MessageId, StoreError> {
        self.append_message(Message::user(conversation_id, content))
            .await
    }

    async fn create_assistant_message(
        &self,
        conversation_id: ConversationId,
        model: &str,
    ) -> Result<MessageId, StoreError> {
        self.append_message(Message::assistant_placeholder(conversation_id, model))
            .await
    }

    async fn update_streaming(&self, id: MessageId, content: &str) -> Result<(), StoreError> {
        self.patch_message(id, |message| {
            message.patch_content(content)?;
            Ok(())
        })
        .await
    }

    async fn finish_streaming(&self, id: MessageId, content: &str) -> Result<(), StoreError> {
        self.patch_message(id, |message| {
            message.finalize(content)?;
            Ok(())
        })
        .await
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl MessageFeed for InMemoryMessageStore {
    fn subscribe(
        &self,
        conversation_id: ConversationId,
        listener: Arc<dyn UpdateListener>,
    ) -> Subscription {
        let token = {
            let mut registry = self.listeners.lock().unwrap();
            let token = registry.next_token;
            registry.next_token += 1;
            registry
                .by_conversation
                .entry(conversation_id)
                .or_default()
                .push((token, listener));
            token
        };

        let registry = Arc::clone(&self.listeners);
        Subscription::new(move || {
            let mut registry = registry.lock().unwrap();
            if let Some(entries) = registry.by_conversation.get_mut(&conversation_id) {
                entries.retain(|(t, _)| *t != token);
                if entries.is_empty() {
                    registry.by_conversation.remove(&conversation_id);
                }
            }
        })
    }
}
