//! Wire protocol between the chat client and the relay endpoint

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Number of trailing history messages included in a relay request.
///
/// The window bounds prompt size and latency; older messages are discarded
/// oldest-first regardless of role.
pub const HISTORY_WINDOW: usize = 10;

/// Inbound relay request body (client to server)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user turn
    pub message: String,
    /// Persona identifier; must name a configured persona
    pub ai_name: String,
    /// Optional project description woven into the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_context: Option<String>,
    /// Trailing window of the conversation, oldest first
    #[serde(default)]
    pub history: Vec<Message>,
}

/// JSON error body returned on non-streaming failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Caller-fixable detail, present on validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Generic user-facing text, present on server-side failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    /// 4xx body: the caller sent something fixable
    pub fn validation(details: impl Into<String>) -> Self {
        Self {
            error: "invalid_request".to_string(),
            details: Some(details.into()),
            message: None,
        }
    }

    /// 5xx body: generic text only, never upstream detail
    pub fn server(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            message: Some(message.into()),
        }
    }
}
