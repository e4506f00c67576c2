use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use opshub_api::{app::build_app, config, database::MemoryStore, is_production};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up ACCESS_TOKEN_SECRET, APP_ENV, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting OpsHub API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if is_production!() {
            anyhow::bail!("ACCESS_TOKEN_SECRET must be set in production");
        }
        tracing::warn!("ACCESS_TOKEN_SECRET is not set; every protected request will fail");
    }

    let app = build_app(config, Arc::new(MemoryStore::new()));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("OpsHub API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
