//! Gateway Adapters.
//!
//! Implementations of the ChatGateway port.
//!
//! ## Available Adapters
//!
//! - `OpenRouterGateway` - OpenRouter chat-completions API with SSE streaming
//! - `MockChatGateway` - Configurable mock for testing
//!
//! The SSE decoding shared by streaming gateways lives in [`sse`].

mod mock;
mod openrouter;
pub mod sse;

pub use mock::{MockChatGateway, MockStream};
pub use openrouter::{OpenRouterConfig, OpenRouterGateway};
pub use sse::{delta_stream, SseDecoder};
