//! Muse Client Library
//!
//! Consumer side of the streaming chat relay: a `ChatSession` composes
//! relay requests from the trailing history window, decodes the response
//! byte stream incrementally, republishes ordered state updates, and keeps
//! the placeholder assistant message consistent through completion,
//! interruption, and user cancellation.

pub mod auth;
pub mod events;
pub mod session;

pub use auth::{StaticToken, TokenProvider};
pub use events::ChatEvent;
pub use session::{ChatSession, SessionConfig, STREAM_ERROR_MESSAGE};
