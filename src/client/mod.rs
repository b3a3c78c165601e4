// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! CubeOS backend client
//!
//! [`ResourceClient`] is the seam the caches talk through; [`HttpClient`] is
//! the `reqwest` implementation used by the service.

mod http;
mod sse;

use std::future::Future;

use serde_json::Value;

use crate::error::ApiError;

pub use http::HttpClient;
pub use sse::{EventStream, SseDecoder, SseEvent, StreamState};

/// JSON-over-HTTP access to backend resources
///
/// Failures carry the HTTP status when the backend produced one, which is
/// what separates "capability absent" from transient errors.
pub trait ResourceClient: Send + Sync + 'static {
    fn get(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn post(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn put(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn delete(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    /// Opens a live event stream, delivering every event to `on_event`
    fn subscribe<F>(
        &self,
        path: &str,
        on_event: F,
    ) -> impl Future<Output = Result<EventStream, ApiError>> + Send
    where
        F: FnMut(SseEvent) + Send + 'static;
}
