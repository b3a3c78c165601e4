// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Metric family registration

use super::MetricsRegistry;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::metrics::labels::{FeedLabels, MutationLabels, PollLabels, ResourceLabels};

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let polls = Family::<PollLabels, Counter>::default();
        registry.register(
            "cubeos_poll",
            "Background polls per resource and outcome",
            polls.clone(),
        );
        let poll_duration_milliseconds = Family::<ResourceLabels, Gauge>::default();
        registry.register(
            "cubeos_poll_duration_milliseconds",
            "Duration of the last poll of a resource in milliseconds",
            poll_duration_milliseconds.clone(),
        );
        let poll_cycle_duration_milliseconds = Gauge::default();
        registry.register(
            "cubeos_poll_cycle_duration_milliseconds",
            "Duration of the last full poll cycle in milliseconds",
            poll_cycle_duration_milliseconds.clone(),
        );

        let cache_hits = Family::<ResourceLabels, Counter>::default();
        registry.register(
            "cubeos_cache_hits",
            "Requests served from a fresh cache entry",
            cache_hits.clone(),
        );
        let cache_joins = Family::<ResourceLabels, Counter>::default();
        registry.register(
            "cubeos_cache_joins",
            "Requests that joined a load already in flight",
            cache_joins.clone(),
        );
        let cache_loads = Family::<ResourceLabels, Counter>::default();
        registry.register(
            "cubeos_cache_loads",
            "Loads sent to the backend",
            cache_loads.clone(),
        );
        let suppressed_resources = Gauge::default();
        registry.register(
            "cubeos_suppressed_resources",
            "Resources currently suppressed as absent",
            suppressed_resources.clone(),
        );
        let absent_markers_swept = Counter::default();
        registry.register(
            "cubeos_absent_markers_swept",
            "Expired absence markers removed by the sweep task",
            absent_markers_swept.clone(),
        );

        let favorite_mutations = Family::<MutationLabels, Counter>::default();
        registry.register(
            "cubeos_favorite_mutations",
            "Favorite toggles by outcome (committed, rolled_back, ignored)",
            favorite_mutations.clone(),
        );

        let live_events = Family::<FeedLabels, Gauge>::default();
        registry.register(
            "cubeos_live_events",
            "Events received on a live feed",
            live_events.clone(),
        );

        Self {
            registry: Arc::new(Mutex::new(registry)),
            polls,
            poll_duration_milliseconds,
            poll_cycle_duration_milliseconds,
            cache_hits,
            cache_joins,
            cache_loads,
            suppressed_resources,
            absent_markers_swept,
            favorite_mutations,
            live_events,
        }
    }
}
