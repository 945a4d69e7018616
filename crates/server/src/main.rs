//! sitefeed server entry point.
//!
//! Boots the HTTP server that turns stored site definitions into RSS feeds.
//! Logs are JSON lines on stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use sitefeed_client::Acquirer;
use sitefeed_core::{AppConfig, open_store};

mod auth;
mod error;
mod feeds;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let store = open_store(&config).await.context("opening object store")?;
    let acquirer = build_acquirer(&config).await?;

    let bind_addr = config.bind_addr.clone();
    let app = routes::router(AppState::new(config, store, Arc::new(acquirer)));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "Starting sitefeed server");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("sitefeed server stopped");
    Ok(())
}

/// Plain HTTP acquirer, plus a headless browser when rendering is enabled.
///
/// A browser that fails to launch is logged and left out; SDDs that need it
/// then fail with `RENDER_DISABLED`.
async fn build_acquirer(config: &AppConfig) -> Result<Acquirer> {
    let acquirer = Acquirer::from_config(config).context("building HTTP client")?;

    #[cfg(feature = "render")]
    {
        if config.render_enabled {
            match sitefeed_client::HeadlessRenderer::new().await {
                Ok(renderer) => {
                    tracing::info!("headless renderer ready");
                    return Ok(acquirer.with_renderer(Arc::new(renderer)));
                }
                Err(e) => tracing::warn!(error = %e, "headless renderer unavailable"),
            }
        }
    }

    #[cfg(not(feature = "render"))]
    {
        if config.render_enabled {
            tracing::warn!("render_enabled is set but this build has no render support");
        }
    }

    Ok(acquirer)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
