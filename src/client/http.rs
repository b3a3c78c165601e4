// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! `reqwest` implementation of the resource client

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;

use super::ResourceClient;
use super::sse::{EventStream, SseEvent};
use crate::config::Config;
use crate::error::ApiError;

/// HTTP client bound to one CubeOS backend
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
    request_timeout: Duration,
}

impl HttpClient {
    /// Builds a client from the service configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the TLS
    /// backend cannot be initialised.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Self::with_base_url(
            &config.api_url,
            config.api_token.as_deref(),
            config.cache.request_timeout,
        )
    }

    pub fn with_base_url(
        base_url: &str,
        token: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        // No client-wide timeout: it would also cut long-lived event streams.
        let client = reqwest::Client::builder().build()?;

        let mut auth_header = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::Internal(format!("invalid API token: {e}")))?;
            auth_header.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!("{} {}", method, url);
        self.client
            .request(method, url)
            .headers(self.auth_header.clone())
            .timeout(self.request_timeout)
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| self.classify(e))?;
        parse_response(response).await
    }

    fn classify(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.request_timeout)
        } else {
            error.into()
        }
    }
}

impl ResourceClient for HttpClient {
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, ApiError> {
        let mut request = self.request(Method::GET, path);
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = request.send().await.map_err(|e| self.classify(e))?;
        parse_response(response).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.send_json(Method::POST, path, body).await
    }

    async fn put(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, path, body).await
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.send_json(Method::DELETE, path, body).await
    }

    async fn subscribe<F>(&self, path: &str, on_event: F) -> Result<EventStream, ApiError>
    where
        F: FnMut(SseEvent) + Send + 'static,
    {
        let url = format!("{}{}", self.base_url, path);
        let open = self
            .client
            .get(&url)
            .headers(self.auth_header.clone())
            .header(ACCEPT, "text/event-stream")
            .send();
        // Only the handshake is bounded; the body stays open indefinitely.
        let response = tokio::time::timeout(self.request_timeout, open)
            .await
            .map_err(|_| ApiError::Timeout(self.request_timeout))?
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::status(status.as_u16(), error_message(&text)));
        }

        tracing::debug!("Opened event stream {}", url);
        Ok(EventStream::spawn(path, response.bytes_stream(), on_event))
    }
}

async fn parse_response(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    if status.is_success() {
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(ApiError::status(status.as_u16(), error_message(&text)))
    }
}

/// Extracts a human-readable message from an error body
fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["error", "message", "detail"] {
            if let Some(Value::String(message)) = map.get(field) {
                return message.clone();
            }
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> HttpClient {
        HttpClient::with_base_url(base_url, Some("token"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_error_message_prefers_json_fields() {
        assert_eq!(error_message(r#"{"error":"gpio not supported"}"#), "gpio not supported");
        assert_eq!(error_message(r#"{"message":"down"}"#), "down");
        assert_eq!(error_message("plain text\n"), "plain text");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = client("http://cubeos.local:6010/");
        assert_eq!(client.base_url(), "http://cubeos.local:6010");
    }

    #[tokio::test]
    async fn test_get_decodes_json_and_sends_query() {
        let app = Router::new().route(
            "/api/v1/logs",
            get(
                |axum::extract::RawQuery(query): axum::extract::RawQuery,
                 headers: axum::http::HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(serde_json::json!({ "query": query, "auth": auth }))
                },
            ),
        );
        let base = serve(app).await;

        let value = client(&base)
            .get("/api/v1/logs", &[("lines".to_string(), "10".to_string())])
            .await
            .unwrap();

        assert_eq!(value["query"], "lines=10");
        assert_eq!(value["auth"], "Bearer token");
    }

    #[tokio::test]
    async fn test_error_status_is_preserved() {
        let app = Router::new().route(
            "/api/v1/hardware/gpio",
            get(|| async {
                (
                    AxumStatus::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({ "error": "gpio not present" })),
                )
            }),
        );
        let base = serve(app).await;

        let err = client(&base)
            .get("/api/v1/hardware/gpio", &[])
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::status(503, "gpio not present"));
        assert!(err.is_capability_absent());
    }

    #[tokio::test]
    async fn test_no_content_is_null() {
        let app = Router::new().route(
            "/api/v1/preferences/favorites/demo",
            axum::routing::delete(|| async { AxumStatus::NO_CONTENT }),
        );
        let base = serve(app).await;

        let value = client(&base)
            .delete("/api/v1/preferences/favorites/demo", None)
            .await
            .unwrap();

        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_subscribe_times_out_on_silent_backend() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let timeout = Duration::from_millis(200);
        let client =
            HttpClient::with_base_url(&format!("http://{addr}"), None, timeout).unwrap();

        let result = client
            .subscribe("/api/v1/monitoring/stream", |_| {})
            .await;

        assert!(matches!(result, Err(ApiError::Timeout(t)) if t == timeout));
    }

    #[tokio::test]
    async fn test_subscribe_reports_error_status() {
        let app = Router::new().route(
            "/api/v1/communication/events",
            get(|| async { (AxumStatus::NOT_IMPLEMENTED, "mesh disabled") }),
        );
        let base = serve(app).await;

        let result = client(&base)
            .subscribe("/api/v1/communication/events", |_| {})
            .await;

        assert!(matches!(result, Err(e) if e == ApiError::status(501, "mesh disabled")));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"))
            .get("/api/v1/apps", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.is_capability_absent());
    }
}
