//! Muse relay server binary

use clap::Parser;
use tracing::info;

use muse_core::config::UpstreamConfig;
use muse_relay::RelayConfig;

/// Streaming AI chat relay for the Muse project workspace
#[derive(Debug, Parser)]
#[command(name = "muse", version, about)]
struct Args {
    /// Address to bind
    #[arg(long, env = "MUSE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "MUSE_PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RelayConfig {
        host: args.host,
        port: args.port,
        upstream: UpstreamConfig::from_env(),
    };

    if config.upstream.api_key.is_none() {
        // requests will fail with a configuration error until a key is set
        tracing::warn!("no upstream API key configured (MUSE_UPSTREAM_API_KEY)");
    }
    info!(model = %config.upstream.model, "starting muse relay");

    muse_relay::serve(config).await?;
    Ok(())
}
