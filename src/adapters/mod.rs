//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the relay core to external systems:
//! - `gateway` - Text-generation gateway clients (OpenRouter, mock) and the
//!   SSE stream decoder
//! - `storage` - Message/conversation store implementations

pub mod gateway;
pub mod storage;

pub use gateway::{MockChatGateway, MockStream, OpenRouterConfig, OpenRouterGateway, SseDecoder};
pub use storage::InMemoryMessageStore;
