// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Error types for the dashboard state service

use std::time::Duration;

use thiserror::Error;

/// HTTP status reported by the backend when a feature is not supported
pub const STATUS_NOT_IMPLEMENTED: u16 = 501;

/// HTTP status reported by the backend when a capability is unavailable
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or IO error
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// CubeOS backend error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Address parsing error
    #[error("Address parse error")]
    AddrParse(#[from] std::net::AddrParseError),
}

/// Error surfaced by the resource client and the cache layer.
///
/// Cloneable so a single failed load can be handed to every caller that
/// joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection refused, reset, DNS failure and the like
    #[error("Transport error: {0}")]
    Transport(String),

    /// Load did not finish within the request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller stopped waiting
    #[error("Request cancelled")]
    Cancelled,

    /// Loader task panicked or was aborted
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code, if the backend produced one
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True only for the responses meaning "this capability does not exist here".
    ///
    /// Everything else is transient and must keep being retried.
    #[must_use]
    pub fn is_capability_absent(&self) -> bool {
        matches!(
            self.status_code(),
            Some(STATUS_NOT_IMPLEMENTED | STATUS_SERVICE_UNAVAILABLE)
        )
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            Self::status(status.as_u16(), error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Convenient alias for Result with application error
pub type Result<T> = std::result::Result<T, AppError>;
