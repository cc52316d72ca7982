//! passdrop-relay binary entry point.
//!
//! Usage:
//! ```bash
//! passdrop-relay --config relay.toml
//! ```

use anyhow::{Context, Result};
use passdrop_relay::config::Config;
use passdrop_relay::http;
use passdrop_relay::ledger::SqliteLedger;
use passdrop_relay::server::Relay;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("passdrop_relay=info,info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config_path = get_config_path();
    let config = if config_path.exists() {
        Config::from_file(&config_path)
            .with_context(|| format!("loading config from {}", config_path.display()))?
    } else {
        info!("no config file at {}, using defaults", config_path.display());
        Config::default()
    };

    let ledger = SqliteLedger::new(&config.storage.database)
        .await
        .with_context(|| format!("opening ledger at {}", config.storage.database.display()))?;

    let bind_address = config.server.bind_address.clone();
    let relay = Arc::new(Relay::new(config, ledger));

    http::health::init_start_time();
    let app = http::build_router(relay);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    info!("passdrop-relay v{} listening on {}", env!("CARGO_PKG_VERSION"), bind_address);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("relay.toml"))
}
