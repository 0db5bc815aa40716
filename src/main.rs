mod api;
mod bot;
mod config;
mod format;
mod router;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::HttpApi;
use crate::bot::BotSession;
use crate::config::Config;
use crate::router::Router;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tiffybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a missing variable refuses startup here, before
    // the listener binds.
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Public URL: {}", config.public_url);
    info!("  Price feed: {}", config.price_api_url);
    info!("  Token contract: {}", config.token_contract);

    let api = Arc::new(HttpApi::new(&config).context("Failed to build HTTP client")?);
    let telegram = Bot::new(&config.bot_token);
    let session = BotSession::new(telegram.clone(), config.public_url.clone());

    // Single producer (webhook endpoint), single consumer (update loop).
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let command_router = Router::new(api, config.token_contract.clone());
    let worker = tokio::spawn(bot::process_updates(
        updates_rx,
        command_router,
        Arc::new(telegram),
    ));

    // A failed registration leaves the service reachable but degraded:
    // probes answer, inbound delivery waits for an operator.
    if let Err(e) = session.register_webhook().await {
        error!("webhook registration failed, running degraded: {e:#}");
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on {addr}");
    axum::serve(listener, server::router(updates_tx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Server stopped and dropped the queue's producer: stop Telegram
    // deliveries, then let the loop drain what was already queued.
    session.release().await;
    worker.await.context("update processing loop panicked")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutdown signal received");
}
