//! Prompt context assembly for gateway requests.
//!
//! The gateway must never be fed an in-flight placeholder as history, so
//! assembly filters on the streaming flag before mapping to (role, content)
//! pairs.

use serde::{Deserialize, Serialize};

use super::message::{Message, Role};

/// A (role, content) pair in the prompt history sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Who authored this turn.
    pub role: Role,
    /// Turn content.
    pub content: String,
}

impl PromptMessage {
    /// Creates a user prompt message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant prompt message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Builds the gateway prompt history from the full ordered message list.
///
/// Messages whose streaming flag is still set are dropped; everything else
/// maps to a [`PromptMessage`] in the same order.
pub fn assemble(messages: &[Message]) -> Vec<PromptMessage> {
    messages
        .iter()
        .filter(|m| !m.is_streaming())
        .map(|m| PromptMessage {
            role: m.role(),
            content: m.content().to_string(),
        })
        .collect()
}
