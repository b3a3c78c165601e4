// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Suppression of resources that reported "capability absent"

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// What the poller currently believes about a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Never polled, or a suppression window just ended
    Unknown,
    /// Last poll succeeded
    Present,
    /// Reported absent; polls are skipped until the marker expires
    Suppressed,
}

#[derive(Debug, Clone, Copy)]
struct AbsentMarker {
    marked_at: Instant,
    ttl: Duration,
}

impl AbsentMarker {
    fn is_expired(&self) -> bool {
        self.marked_at.elapsed() >= self.ttl
    }

    fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.marked_at.elapsed())
    }
}

#[derive(Default)]
struct AbsenceState {
    markers: HashMap<String, AbsentMarker>,
    present: HashMap<String, Instant>,
}

impl AbsenceState {
    fn purge_key(&mut self, key: &str) {
        if self.markers.get(key).is_some_and(AbsentMarker::is_expired) {
            self.markers.remove(key);
            tracing::debug!("Absence marker for {} expired, polling resumes", key);
        }
    }
}

/// Per-key absence markers with bounded lifetime
#[derive(Default)]
pub struct AbsenceTracker {
    state: Mutex<AbsenceState>,
}

impl AbsenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while an unexpired absence marker exists for `key`
    pub async fn should_skip(&self, key: &str) -> bool {
        let mut state = self.state.lock().await;
        state.purge_key(key);
        state.markers.contains_key(key)
    }

    /// Records that `key` was just reported absent
    pub async fn mark_absent(&self, key: &str, ttl: Duration) {
        let mut state = self.state.lock().await;
        state.present.remove(key);
        state.markers.insert(
            key.to_string(),
            AbsentMarker {
                marked_at: Instant::now(),
                ttl,
            },
        );
        tracing::debug!("Marked {} absent for {:?}", key, ttl);
    }

    /// Lifts suppression for `key` immediately
    pub async fn clear_absent(&self, key: &str) {
        let mut state = self.state.lock().await;
        if state.markers.remove(key).is_some() {
            tracing::debug!("Cleared absence marker for {}", key);
        }
    }

    /// Records a successful poll of `key`
    pub async fn record_present(&self, key: &str) {
        let mut state = self.state.lock().await;
        state.markers.remove(key);
        state.present.insert(key.to_string(), Instant::now());
    }

    pub async fn presence(&self, key: &str) -> Presence {
        let mut state = self.state.lock().await;
        state.purge_key(key);
        if state.markers.contains_key(key) {
            Presence::Suppressed
        } else if state.present.contains_key(key) {
            Presence::Present
        } else {
            Presence::Unknown
        }
    }

    /// Time left before polling of `key` resumes
    pub async fn remaining(&self, key: &str) -> Option<Duration> {
        let state = self.state.lock().await;
        state
            .markers
            .get(key)
            .filter(|marker| !marker.is_expired())
            .map(AbsentMarker::remaining)
    }

    /// Removes every expired marker, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.markers.len();
        state.markers.retain(|_, marker| !marker.is_expired());
        let removed = before - state.markers.len();
        if removed > 0 {
            tracing::debug!("Purged {} expired absence markers", removed);
        }
        removed
    }

    /// Number of keys currently suppressed
    pub async fn suppressed(&self) -> usize {
        let state = self.state.lock().await;
        state.markers.values().filter(|m| !m.is_expired()).count()
    }
}
