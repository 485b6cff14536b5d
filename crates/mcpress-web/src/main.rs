//! mcpress server entry point.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcpress_web::{AppState, ServerConfig, WebServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment file before anything reads settings.
    mcpress_core::config::load_environment();

    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mcpress_web=debug")),
        )
        .init();

    info!("mcpress {} starting", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(AppState::from_env().await);
    let config = ServerConfig::from_env();
    info!("API at http://{}/api", config.addr());

    WebServer::new(config, state).run().await?;

    info!("server shutdown complete");
    Ok(())
}
