//! Muse Relay
//!
//! Server-side entry point of the streaming chat relay. Each request is an
//! independent asynchronous task bound to one upstream connection: validate
//! the body, resolve the persona, assemble the prompt, then pipe the
//! upstream byte stream to the caller as it arrives, without buffering.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use muse_core::config::UpstreamConfig;
use muse_core::persona::PersonaRegistry;
use muse_core::upstream::UpstreamClient;
use muse_core::MuseResult;

pub use error::ApiError;

/// Shared per-process state.
///
/// Everything here is immutable after startup; requests share nothing
/// mutable with each other.
#[derive(Clone)]
pub struct AppState {
    pub personas: Arc<PersonaRegistry>,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(personas: Arc<PersonaRegistry>, upstream: Arc<UpstreamClient>) -> Self {
        Self { personas, upstream }
    }
}

/// Relay server settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub upstream: UpstreamConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self {
            host: muse_core::config::env_or("MUSE_HOST", "0.0.0.0"),
            port: muse_core::config::env_parse("MUSE_PORT", 8080),
            upstream: UpstreamConfig::from_env(),
        }
    }
}

/// Build the relay router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat", post(handlers::chat))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: RelayConfig) -> MuseResult<()> {
    let upstream = UpstreamClient::new(config.upstream.clone())?;
    let state = AppState::new(
        Arc::new(PersonaRegistry::builtin()),
        Arc::new(upstream),
    );
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("relay listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
