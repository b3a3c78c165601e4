// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prometheus metrics for the dashboard state service
//!
//! Polls by outcome, coalescer counters, suppressed resources, favorite
//! mutations and live feed traffic.

mod labels;
mod registry;

/// Label sets shared by the metric families
pub use labels::{FeedLabels, MutationLabels, PollLabels, ResourceLabels};

/// Prometheus metrics registry
pub use registry::MetricsRegistry;
