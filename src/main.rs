// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cubeos_dashboard_state::client::HttpClient;
use cubeos_dashboard_state::{
    AppError, AppState, Config, Dashboard, MetricsRegistry, Result, create_router,
    start_polling_loop,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    setup_tracing();

    let config = Config::from_env();
    tracing::info!("CubeOS API at {}", config.api_url);
    tracing::info!(
        "Polling every {}s, cache TTL {:?}, absent TTL {:?}",
        config.poll_interval_secs,
        config.cache.ttl,
        config.cache.absent_ttl
    );

    let client = Arc::new(HttpClient::new(&config).map_err(|e| {
        tracing::error!("Failed to build API client: {}", e);
        AppError::from(e)
    })?);
    let dashboard = Arc::new(Dashboard::new(client, config.cache));
    let metrics = MetricsRegistry::new();

    let state = Arc::new(AppState {
        config: config.clone(),
        dashboard: Arc::clone(&dashboard),
        metrics: metrics.clone(),
    });

    // Graceful shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let opened = dashboard.live.open_all().await;
    tracing::info!("Opened {} live feed(s)", opened);

    let poller = start_polling_loop(
        shutdown_rx.clone(),
        Arc::clone(&dashboard),
        metrics,
        Duration::from_secs(config.poll_interval_secs),
    );

    let app = create_router(state);

    let addr: SocketAddr = config.server_addr.parse().map_err(|e| {
        tracing::error!("Invalid server address: {}", e);
        e
    })?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind address: {}", e);
        e
    })?;

    tracing::info!("CubeOS dashboard state starting on {}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  - GET  /health                - Health check");
    tracing::info!("  - GET  /metrics               - Prometheus metrics");
    tracing::info!("  - GET  /state                 - Dashboard snapshot");
    tracing::info!("  - POST /favorites/{{name}}/toggle - Toggle app favorite");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.clone().changed().await;
            tracing::info!("HTTP server shutting down");
        })
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            e
        })?;

    let _ = poller.await;
    dashboard.live.shutdown().await;
    tracing::info!("Stopped");

    Ok(())
}

fn setup_tracing() {
    // RUST_LOG wins; "info" otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
