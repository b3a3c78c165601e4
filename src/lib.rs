// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # CubeOS Dashboard State
//!
//! Headless state layer for the CubeOS appliance dashboard.
//!
//! Polls the CubeOS backend over HTTP/JSON, follows its SSE feeds, and keeps
//! the latest value of every resource in memory behind a client-side cache
//! that coalesces concurrent loads, applies optimistic mutations and stops
//! polling resources the appliance reports as absent.
//!
//! ## Main modules
//! - `api`: HTTP API handlers
//! - `cache`: coalescer, optimistic mutations, absence suppression
//! - `client`: backend client and SSE reader
//! - `config`: configuration management
//! - `error`: error types
//! - `metrics`: Prometheus metrics registry
//! - `poller`: background polling and sweep tasks
//! - `stores`: per-domain stores and the dashboard session
//! - `prelude`: commonly used types and traits

mod api;
pub mod cache;
pub mod client;
mod config;
mod error;
mod metrics;
mod poller;
pub mod prelude;
pub mod stores;

#[cfg(test)]
mod testing;

// Re-export commonly used types
/// Application configuration
pub use config::{CachePolicy, Config};

/// Application and client error types
pub use error::{ApiError, AppError, Result};

/// HTTP API router and state
pub use api::handlers::{ErrorResponse, HealthResponse, ToggleResponse};
pub use api::{AppState, create_router};

/// Background polling loop
pub use poller::{SWEEP_INTERVAL, start_polling_loop};

/// Metrics registry
pub use metrics::MetricsRegistry;

/// Dashboard session
pub use stores::{Dashboard, DashboardSnapshot, Target};
