//! Deployment configuration, loaded from the environment at startup

use std::time::Duration;

/// Upstream completion API settings.
///
/// Generation parameters are fixed per deployment rather than
/// caller-controlled, which bounds cost and latency.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the completion API
    pub base_url: String,
    /// Bearer credential; read from server-side configuration only
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Connect timeout only: a live stream is bounded by the transport,
    /// not by this client
    pub connect_timeout: Duration,
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("MUSE_UPSTREAM_URL", "https://api.openai.com/v1"),
            api_key: std::env::var("MUSE_UPSTREAM_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            model: env_or("MUSE_UPSTREAM_MODEL", "gpt-4o-mini"),
            temperature: env_parse("MUSE_UPSTREAM_TEMPERATURE", 0.7),
            max_tokens: env_parse("MUSE_UPSTREAM_MAX_TOKENS", 1024),
            connect_timeout: Duration::from_secs(env_parse(
                "MUSE_UPSTREAM_CONNECT_TIMEOUT_SECS",
                10,
            )),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Read an environment variable with a fallback
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, falling back on absence or
/// parse failure
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
