//! HTTP API for ecoponto that lets mobile clients browse and register waste collection points.

mod app;
mod config;
mod error;
mod input;
mod routes;
mod view;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ecoponto_core::{AssetBaseUrl, PointService};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(err).context("failed to read .env file");
    }

    let config = Config::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "ecoponto_server=debug,ecoponto_core=info,ecoponto_store_sqlite=info,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Storage + service setup
    let pool = ecoponto_store_sqlite::connect(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    ecoponto_store_sqlite::migrate(&pool)
        .await
        .context("failed to apply database migrations")?;
    info!(database = %config.database_url, "database ready");

    let service = PointService::new(
        ecoponto_store_sqlite::backend(pool),
        AssetBaseUrl::new(config.asset_base_url.clone()),
    );
    let app = routes::router(AppState::new(Arc::new(service)));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, assets = %config.asset_base_url, "ecoponto server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
