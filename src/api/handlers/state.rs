use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::api::AppState;
use crate::client::ResourceClient;

/// GET /state
pub async fn state_handler<C: ResourceClient>(
    State(state): State<Arc<AppState<C>>>,
) -> impl IntoResponse {
    Json(state.dashboard.snapshot().await)
}
