//! Muse Core Library
//!
//! Shared building blocks for the Muse streaming chat relay: conversation
//! and wire types, the persona registry, the SSE line decoder, the bounded
//! chat history store, and the upstream completion client.

pub mod config;
pub mod error;
pub mod history;
pub mod message;
pub mod persona;
pub mod sse;
pub mod upstream;
pub mod wire;

// Re-export commonly used types
pub use config::UpstreamConfig;
pub use error::{MuseError, MuseResult};
pub use history::{FileHistoryCache, HistoryCache, HistoryStore};
pub use message::{Message, MessageRole, PromptMessage};
pub use persona::{Persona, PersonaRegistry};
pub use upstream::{ByteStream, UpstreamClient};
pub use wire::{ChatRequest, ErrorBody, HISTORY_WINDOW};
