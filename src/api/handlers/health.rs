use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::client::ResourceClient;

/// Health check endpoint response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub suppressed_resources: usize,
}

/// GET /health
///
/// Always "ok" while the service runs; suppressed resources are informational.
pub async fn health_check<C: ResourceClient>(
    State(state): State<Arc<AppState<C>>>,
) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        suppressed_resources: state.dashboard.suppressed().await,
    };

    (StatusCode::OK, Json(response))
}
