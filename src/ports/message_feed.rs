//! Message Feed port - Push updates for conversation subscribers.
//!
//! Front ends follow an in-progress reply by subscribing to a conversation;
//! the store invokes the listener after every underlying change. The
//! returned handle releases the registration deterministically (explicitly
//! or on drop), so a replaced subscription never leaks the previous one.

use std::fmt;
use std::sync::Arc;

use crate::domain::conversation::Message;
use crate::domain::foundation::ConversationId;

/// Callback invoked with the conversation's full ordered message list
/// after each change.
///
/// Implementations should be quick; long work belongs on a task of its own.
pub trait UpdateListener: Send + Sync {
    /// Receives the post-change state of the conversation log.
    fn on_update(&self, conversation_id: ConversationId, messages: &[Message]);
}

/// Port for subscribing to conversation changes.
pub trait MessageFeed: Send + Sync {
    /// Registers a listener for one conversation.
    ///
    /// The listener stays registered until the returned [`Subscription`]
    /// is released.
    fn subscribe(
        &self,
        conversation_id: ConversationId,
        listener: Arc<dyn UpdateListener>,
    ) -> Subscription;
}

/// Handle for an active subscription.
///
/// Dropping the handle releases the registration; [`Subscription::unsubscribe`]
/// does the same explicitly.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a handle that runs `release` exactly once when released.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Releases the subscription now.
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
