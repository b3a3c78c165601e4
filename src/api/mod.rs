// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! HTTP API for the dashboard state service
//!
//! # Endpoints
//! - `GET /health` — health check
//! - `GET /metrics` — Prometheus metrics
//! - `GET /state` — JSON snapshot of every store
//! - `POST /favorites/{name}/toggle` — optimistic favorite toggle

pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::client::ResourceClient;
use crate::config::Config;
use crate::metrics::MetricsRegistry;
use crate::stores::Dashboard;

/// Application state shared with endpoints
pub struct AppState<C> {
    pub config: Config,
    pub dashboard: Arc<Dashboard<C>>,
    pub metrics: MetricsRegistry,
}

/// Creates the main Axum router with all endpoints
pub fn create_router<C: ResourceClient>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check::<C>))
        .route("/metrics", get(handlers::metrics_handler::<C>))
        .route("/state", get(handlers::state_handler::<C>))
        .route(
            "/favorites/{name}/toggle",
            post(handlers::toggle_favorite::<C>),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CachePolicy;
    use crate::testing::FakeClient;

    pub(crate) fn app_state(client: Arc<FakeClient>) -> Arc<AppState<FakeClient>> {
        Arc::new(AppState {
            config: Config::default(),
            dashboard: Arc::new(Dashboard::new(client, CachePolicy::default())),
            metrics: MetricsRegistry::new(),
        })
    }

    #[test]
    fn test_create_router() {
        let _router = create_router(app_state(Arc::new(FakeClient::new())));
        // If we get here without panicking, the router was created successfully
    }

    #[test]
    fn test_app_state_creation() {
        let state = app_state(Arc::new(FakeClient::new()));

        assert_eq!(state.config.server_addr, "0.0.0.0:9191");
        assert_eq!(state.config.poll_interval_secs, 10);
    }
}
