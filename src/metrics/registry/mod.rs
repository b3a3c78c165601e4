// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Metrics registry and update logic

mod init;
mod record;

use crate::metrics::labels::{FeedLabels, MutationLabels, PollLabels, ResourceLabels};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Mutex<Registry>>,
    // poll results
    polls: Family<PollLabels, Counter>,
    poll_duration_milliseconds: Family<ResourceLabels, Gauge>,
    poll_cycle_duration_milliseconds: Gauge,
    // coalescer counters, mirrored from the caches
    cache_hits: Family<ResourceLabels, Counter>,
    cache_joins: Family<ResourceLabels, Counter>,
    cache_loads: Family<ResourceLabels, Counter>,
    suppressed_resources: Gauge,
    absent_markers_swept: Counter,
    // user actions
    favorite_mutations: Family<MutationLabels, Counter>,
    // live feeds
    live_events: Family<FeedLabels, Gauge>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
