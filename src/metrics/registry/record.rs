// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Recording helpers and text encoding

use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;

use super::MetricsRegistry;
use crate::metrics::labels::{FeedLabels, MutationLabels, PollLabels, ResourceLabels};
use crate::stores::CacheCounters;

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Moves `counter` up to `total`, a monotonic count kept elsewhere
fn catch_up(counter: &Counter, total: u64) {
    let seen = counter.get();
    if total > seen {
        counter.inc_by(total - seen);
    }
}

impl MetricsRegistry {
    pub async fn encode_metrics(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let registry = self.registry.lock().await;
        let mut buffer = String::new();
        encode(&mut buffer, &registry)?;
        Ok(buffer)
    }

    pub fn record_poll(&self, resource: &str, outcome: &str, duration: Duration) {
        self.polls
            .get_or_create(&PollLabels::new(resource, outcome))
            .inc();
        // Skipped polls never reach the network; keep the last real duration
        if outcome != "skipped" {
            self.poll_duration_milliseconds
                .get_or_create(&ResourceLabels::new(resource))
                .set(millis(duration));
        }
    }

    pub fn record_cycle_duration(&self, duration: Duration) {
        self.poll_cycle_duration_milliseconds.set(millis(duration));
    }

    pub fn update_cache_counters(&self, counters: &[CacheCounters]) {
        for counter in counters {
            let labels = ResourceLabels::new(counter.target.name());
            catch_up(&self.cache_hits.get_or_create(&labels), counter.hits);
            catch_up(&self.cache_joins.get_or_create(&labels), counter.joins);
            catch_up(&self.cache_loads.get_or_create(&labels), counter.loads);
        }
    }

    pub fn set_suppressed(&self, count: usize) {
        self.suppressed_resources
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn record_swept(&self, count: usize) {
        self.absent_markers_swept.inc_by(count as u64);
    }

    pub fn record_mutation(&self, outcome: &str) {
        self.favorite_mutations
            .get_or_create(&MutationLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub fn set_live_events(&self, feed: &str, count: u64) {
        self.live_events
            .get_or_create(&FeedLabels {
                feed: feed.to_string(),
            })
            .set(gauge_value(count));
    }

    /// Poll count for one resource and outcome
    pub fn poll_count(&self, resource: &str, outcome: &str) -> u64 {
        self.polls
            .get_or_create(&PollLabels::new(resource, outcome))
            .get()
    }

    pub fn mutation_count(&self, outcome: &str) -> u64 {
        self.favorite_mutations
            .get_or_create(&MutationLabels {
                outcome: outcome.to_string(),
            })
            .get()
    }
}
