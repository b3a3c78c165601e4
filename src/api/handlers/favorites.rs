use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error_response;
use crate::api::AppState;
use crate::client::ResourceClient;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub name: String,
    pub favorite: bool,
    pub favorites: Vec<String>,
}

fn gateway_status(error: &ApiError) -> StatusCode {
    match error {
        ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// POST /favorites/{name}/toggle
///
/// 200 with the new favorite set, 409 while a toggle of the same app is in
/// flight, 502/504 with the backend message after a rollback.
pub async fn toggle_favorite<C: ResourceClient>(
    State(state): State<Arc<AppState<C>>>,
    Path(name): Path<String>,
) -> Response {
    let apps = &state.dashboard.apps;
    match apps.toggle_favorite(&name).await {
        Ok(true) => {
            state.metrics.record_mutation("committed");
            let response = ToggleResponse {
                favorite: apps.is_favorite(&name),
                favorites: apps.favorites(),
                name,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(false) => {
            state.metrics.record_mutation("ignored");
            error_response(
                StatusCode::CONFLICT,
                format!("toggle of {name} already in progress"),
            )
        }
        Err(e) => {
            state.metrics.record_mutation("rolled_back");
            tracing::warn!("Favorite toggle of {} failed: {}", name, e);
            error_response(gateway_status(&e), e.to_string())
        }
    }
}
