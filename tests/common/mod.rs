// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Fake CubeOS backend served on a loopback port

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use cubeos_dashboard_state::client::HttpClient;
use cubeos_dashboard_state::{CachePolicy, Dashboard};

#[derive(Default)]
pub struct Backend {
    pub favorites: Mutex<Vec<String>>,
    hits: Mutex<HashMap<String, usize>>,
    pub apps_delay_ms: AtomicUsize,
}

impl Backend {
    fn hit(&self, path: &str) {
        *self.hits.lock().unwrap().entry(path.to_string()).or_insert(0) += 1;
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

async fn apps(State(backend): State<Arc<Backend>>) -> impl IntoResponse {
    backend.hit("/api/v1/apps");
    let delay = backend.apps_delay_ms.load(Ordering::Relaxed) as u64;
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Json(json!({ "apps": [
        { "name": "pihole", "title": "Pi-hole", "status": "running", "port": 6001 },
        { "name": "jellyfin", "status": "stopped" }
    ] }))
}

async fn favorites(State(backend): State<Arc<Backend>>) -> impl IntoResponse {
    backend.hit("/api/v1/preferences/favorites");
    Json(json!({ "favorites": backend.favorites.lock().unwrap().clone() }))
}

async fn add_favorite(
    State(backend): State<Arc<Backend>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    backend.hit("POST /api/v1/preferences/favorites");
    if name == "locked" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "preferences locked" })),
        );
    }
    let mut list = backend.favorites.lock().unwrap();
    if !list.contains(&name) {
        list.push(name);
    }
    (StatusCode::OK, Json(json!({ "favorites": list.clone() })))
}

async fn remove_favorite(
    State(backend): State<Arc<Backend>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    backend.hit("DELETE /api/v1/preferences/favorites");
    backend.favorites.lock().unwrap().retain(|n| n != &name);
    StatusCode::NO_CONTENT
}

async fn power(State(backend): State<Arc<Backend>>) -> impl IntoResponse {
    backend.hit("/api/v1/hardware/power");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "no UPS detected" })),
    )
}

async fn stats(State(backend): State<Arc<Backend>>) -> impl IntoResponse {
    backend.hit("/api/v1/system/stats");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "stats collector restarting" })),
    )
}

async fn monitoring() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        ": hello\n\ndata: {\"cpu_percent\": 17.5, \"memory_used\": 1024, \"memory_total\": 4096}\n\n",
    )
}

pub fn router(backend: Arc<Backend>) -> Router {
    Router::new()
        .route("/api/v1/apps", get(apps))
        .route("/api/v1/preferences/favorites", get(favorites))
        .route(
            "/api/v1/preferences/favorites/{name}",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/api/v1/hardware/power", get(power))
        .route("/api/v1/system/stats", get(stats))
        .route("/api/v1/monitoring/stream", get(monitoring))
        .with_state(backend)
}

/// Starts the fake backend and returns its base URL
pub async fn serve(backend: Arc<Backend>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(backend)).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn dashboard(backend: Arc<Backend>) -> Arc<Dashboard<HttpClient>> {
    let base = serve(backend).await;
    let client = HttpClient::with_base_url(&base, None, Duration::from_secs(5)).unwrap();
    Arc::new(Dashboard::new(Arc::new(client), CachePolicy::default()))
}
