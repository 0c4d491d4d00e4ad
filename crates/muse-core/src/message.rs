//! Conversation message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (persona instructions)
    System,
    /// User message (human input)
    User,
    /// Assistant message (streamed AI reply)
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation.
///
/// Serialized camelCase so relay history rows and cached records share one
/// record shape (`id`, `role`, `content`, `timestamp`, `isStreaming`,
/// `isCancelled`, `isError`).
///
/// While `is_streaming` is set, `content` only grows by append until the
/// message is finalized; at most one message per conversation may be
/// streaming at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque unique id
    pub id: String,
    /// Sender role
    pub role: MessageRole,
    /// Message text; mutable only while streaming
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// True while fragments are still being appended
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_streaming: bool,
    /// Set when the user aborted the stream; partial content is kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cancelled: Option<bool>,
    /// Set when the reply failed before any usable content arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming: false,
            is_cancelled: None,
            is_error: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a finalized assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create the empty assistant placeholder that anchors incremental
    /// updates before any network activity begins
    pub fn assistant_placeholder() -> Self {
        let mut message = Self::new(MessageRole::Assistant, "");
        message.is_streaming = true;
        message
    }

    /// The role/content pair sent to the completion API
    pub fn to_prompt(&self) -> PromptMessage {
        PromptMessage::new(self.role, self.content.clone())
    }
}

/// Role/content pair in the shape the completion API expects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_starts_empty_and_streaming() {
        let message = Message::assistant_placeholder();
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(message.content.is_empty());
        assert!(message.is_streaming);
        assert_eq!(message.is_cancelled, None);
        assert_eq!(message.is_error, None);
    }

    #[test]
    fn messages_get_unique_ids() {
        let a = Message::user("hello");
        let b = Message::user("hello");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_with_camel_case_record_fields() {
        let mut message = Message::assistant("partial");
        message.is_streaming = true;
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["isStreaming"], true);
        assert!(value.get("timestamp").is_some());
        // unset flags stay off the wire
        assert!(value.get("isCancelled").is_none());
        assert!(value.get("isError").is_none());
    }

    #[test]
    fn finalized_message_omits_streaming_flag() {
        let message = Message::user("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("isStreaming").is_none());
    }

    #[test]
    fn deserializes_records_without_optional_flags() {
        let message: Message = serde_json::from_str(
            r#"{"id":"m1","role":"user","content":"hi","timestamp":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(!message.is_streaming);
        assert_eq!(message.role, MessageRole::User);
    }
}
