//! Relay server binary.
//!
//! Loads the config, resolves the upstream API key, and serves the chat
//! and text-to-speech endpoints until interrupted.

use finguru::config::RelayConfig;
use finguru::relay::RelayService;
use finguru::relay::upstream::GeminiClient;
use finguru::server::RelayServer;
use finguru::tts::NullSynthesizer;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::load()?;
    let api_key = config.upstream.api_key.resolve()?;
    let backend = Arc::new(GeminiClient::new(config.upstream.api_url.clone(), api_key));
    let relay = Arc::new(RelayService::new(backend, &config.upstream));

    let server = RelayServer::start(relay, Arc::new(NullSynthesizer), &config.server).await?;
    tracing::info!("POST http://{}/api/chat", server.addr());
    tracing::info!("POST http://{}/api/text-to-speech", server.addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown();
    Ok(())
}
