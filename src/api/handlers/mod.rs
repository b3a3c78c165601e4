// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

mod favorites;
mod health;
mod metrics;
mod state;

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::{Deserialize, Serialize};

pub use favorites::{ToggleResponse, toggle_favorite};
pub use health::{HealthResponse, health_check};
pub use metrics::metrics_handler;
pub use state::state_handler;

/// Body of every non-2xx JSON response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}
