//! Opendata Bridge server
//!
//! Entry point: loads configuration, initialises logging and serves the API.

use std::sync::Arc;

use mimalloc::MiMalloc;
use opendata_bridge::config::{AppConfig, LogConfig, load_assistant_settings};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let config = Arc::new(AppConfig::load()?);
    init_tracing(&config.log);

    let settings = load_assistant_settings()?;

    opendata_bridge::server::start_server(config, settings).await
}

/// Initialize tracing (M-LOG-STRUCTURED)
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
