//! Upstream completion API client
//!
//! Opens the streaming connection and hands the raw byte stream back to the
//! caller, which owns draining it. The client never buffers or interprets
//! the response body, and it never retries: a partial completion cannot be
//! resumed, so retry policy stays with the relay (which, by design, does
//! not retry mid-stream either).

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use serde_json::json;
use tracing::{debug, error};

use crate::config::UpstreamConfig;
use crate::error::{MuseError, MuseResult};
use crate::message::PromptMessage;

/// Raw response byte stream, forwarded verbatim to the relay caller
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Streaming client for the completion API
pub struct UpstreamClient {
    config: UpstreamConfig,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> MuseResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| MuseError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    /// Open a streaming completion for the assembled message list.
    ///
    /// A missing API key is a configuration error, distinct from request
    /// validation. On a non-success status the full upstream body is read
    /// and logged server-side, and the caller gets a generic error: raw
    /// upstream error text is never relayed to clients.
    pub async fn open_stream(&self, messages: &[PromptMessage]) -> MuseResult<ByteStream> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| MuseError::config("upstream API key is not configured"))?;

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let request_body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "opening upstream completion stream"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| MuseError::upstream(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "upstream completion API returned an error");
            return Err(MuseError::upstream("completion API request was rejected"));
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRole;

    #[tokio::test]
    async fn missing_api_key_is_a_config_error_before_any_network_call() {
        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        let messages = [PromptMessage::new(MessageRole::User, "hi")];

        let error = match client.open_stream(&messages).await {
            Ok(_) => panic!("expected a config error, got a stream"),
            Err(e) => e,
        };
        assert!(matches!(error, MuseError::Config(_)));
    }

    #[test]
    fn prompt_messages_serialize_to_the_completion_shape() {
        let message = PromptMessage::new(MessageRole::System, "You are Astra.");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(value["content"], "You are Astra.");
    }
}
