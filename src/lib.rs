//! Chat Relay - Streaming Relay for a Shared Conversation Log
//!
//! This crate implements the streaming relay and message-lifecycle state
//! machine behind a multi-frontend chat application: the user turn is
//! persisted, an assistant placeholder is created, the reply is streamed
//! from a text-generation gateway, and the placeholder is patched under
//! throttling until a single finalize write ends the turn.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
