// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! In-memory resource client for unit tests

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::client::{EventStream, ResourceClient, SseEvent};
use crate::error::ApiError;

type Response = Result<Value, ApiError>;

/// Scripted backend: canned responses per route, call counting, optional latency
#[derive(Default)]
pub(crate) struct FakeClient {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<HashMap<String, usize>>,
    writes: Mutex<Vec<(String, String)>>,
    streams: Mutex<HashMap<String, Vec<String>>>,
    delay: Mutex<Duration>,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, path: &str, value: Value) {
        self.set(route("GET", path), Ok(value));
    }

    pub(crate) fn respond_err(&self, path: &str, error: ApiError) {
        self.set(route("GET", path), Err(error));
    }

    pub(crate) fn respond_write(&self, method: &str, path: &str, response: Response) {
        self.set(route(method, path), response);
    }

    pub(crate) fn stream(&self, path: &str, chunks: &[&str]) {
        self.streams.lock().unwrap().insert(
            path.to_string(),
            chunks.iter().map(|c| (*c).to_string()).collect(),
        );
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// GET calls made for `path`
    pub(crate) fn calls(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&route("GET", path))
            .copied()
            .unwrap_or(0)
    }

    /// Write requests made so far, as `(method, path)`
    pub(crate) fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    fn set(&self, route: String, response: Response) {
        self.responses.lock().unwrap().insert(route, response);
    }

    fn record(&self, method: &str, path: &str) -> (Response, Duration) {
        let route = route(method, path);
        *self.calls.lock().unwrap().entry(route.clone()).or_insert(0) += 1;
        if method != "GET" {
            self.writes
                .lock()
                .unwrap()
                .push((method.to_string(), path.to_string()));
        }
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&route)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::status(404, format!("no fake response for {route}"))));
        (response, *self.delay.lock().unwrap())
    }

    async fn answer(&self, method: &str, path: &str) -> Response {
        let (response, delay) = self.record(method, path);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

fn route(method: &str, path: &str) -> String {
    format!("{method} {path}")
}

impl ResourceClient for FakeClient {
    async fn get(&self, path: &str, _params: &[(String, String)]) -> Response {
        self.answer("GET", path).await
    }

    async fn post(&self, path: &str, _body: Option<Value>) -> Response {
        self.answer("POST", path).await
    }

    async fn put(&self, path: &str, _body: Option<Value>) -> Response {
        self.answer("PUT", path).await
    }

    async fn delete(&self, path: &str, _body: Option<Value>) -> Response {
        self.answer("DELETE", path).await
    }

    async fn subscribe<F>(&self, path: &str, on_event: F) -> Result<EventStream, ApiError>
    where
        F: FnMut(SseEvent) + Send + 'static,
    {
        let chunks = self
            .streams
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::status(404, format!("no fake stream for {path}")))?;
        let body = futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, Infallible>(chunk.into_bytes())),
        );
        Ok(EventStream::spawn(path, body, on_event))
    }
}
