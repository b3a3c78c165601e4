// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Absence marker sweep task
//!
//! Markers also expire lazily on the next poll decision; the sweep keeps the
//! suppressed gauge honest for resources nobody polls.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::ResourceClient;
use crate::metrics::MetricsRegistry;
use crate::stores::Dashboard;

/// Sweep interval for expired absence markers (60 seconds)
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub(super) fn start_sweep_task<C: ResourceClient>(
    dashboard: Arc<Dashboard<C>>,
    metrics: MetricsRegistry,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sweep_ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = sweep_ticker.tick() => {
                    let removed = dashboard.sweep().await;
                    if removed > 0 {
                        tracing::debug!("Swept {} expired absence markers", removed);
                    }
                    metrics.record_swept(removed);
                    metrics.set_suppressed(dashboard.suppressed().await);
                },
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!("Stopping absence sweep");
                        break;
                    }
                }
            }
        }
    })
}
