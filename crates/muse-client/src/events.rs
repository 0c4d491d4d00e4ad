//! Ordered state updates published by the chat session

use muse_core::message::Message;

/// One state update for the conversation view.
///
/// Events arrive in causal order; each carries the full current state of
/// the message it concerns, so consumers just render the latest version.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// A message was appended to the conversation
    Appended(Message),
    /// A message changed in place: a streamed fragment arrived or the
    /// message was finalized
    Updated(Message),
}

impl ChatEvent {
    /// The message this event carries
    pub fn message(&self) -> &Message {
        match self {
            ChatEvent::Appended(message) | ChatEvent::Updated(message) => message,
        }
    }
}
