// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! ```rust
//! use cubeos_dashboard_state::prelude::*;
//! ```

// Core types
pub use crate::config::{CachePolicy, Config};
pub use crate::error::{ApiError, AppError, Result};

// Cache building blocks
pub use crate::cache::{
    FetchCoalescer, MutationState, OptimisticStore, PollOutcome, Presence, ResourceCache,
    ResourceQuery,
};

// Backend access
pub use crate::client::{EventStream, HttpClient, ResourceClient, SseEvent};

// Stores
pub use crate::stores::{Dashboard, DashboardSnapshot, Feed, Target};

// Metrics
pub use crate::metrics::MetricsRegistry;
