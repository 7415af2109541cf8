//! Conversation domain module.
//!
//! Entities for the shared conversation log (conversations and their
//! messages), the message lifecycle state machine, the prompt context
//! assembler, and the catalog of selectable models.

mod context;
mod conversation;
mod message;
mod models;

pub use context::{assemble, PromptMessage};
pub use conversation::Conversation;
pub use message::{Message, MessageError, MessageStage, Role};
pub use models::{default_model, model_name, ModelInfo, MODELS};
