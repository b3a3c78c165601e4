// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Background polling of the dashboard resources
//!
//! Every tick polls each resource on its own task and reopens live feeds
//! that dropped, then mirrors cache and live feed counters into the metrics
//! registry.

mod sweep;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::client::ResourceClient;
use crate::metrics::MetricsRegistry;
use crate::stores::{Dashboard, Feed, Target};

pub use sweep::SWEEP_INTERVAL;

/// Starts the background polling loop
///
/// Also starts the sweep task for expired absence markers; both stop when
/// `shutdown_rx` turns `true`.
pub fn start_polling_loop<C: ResourceClient>(
    mut shutdown_rx: watch::Receiver<bool>,
    dashboard: Arc<Dashboard<C>>,
    metrics: MetricsRegistry,
    interval: Duration,
) -> JoinHandle<()> {
    tracing::info!("Starting background polling loop every {:?}", interval);

    let sweep_handle =
        sweep::start_sweep_task(Arc::clone(&dashboard), metrics.clone(), shutdown_rx.clone());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut cycle: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Stopping polling loop");
                        let _ = sweep_handle.await;
                        break;
                    }
                }
            }

            cycle += 1;
            let cycle_start = Instant::now();

            let mut tasks = Vec::with_capacity(Target::ALL.len() + 1);
            tasks.push(tokio::spawn({
                let dashboard = Arc::clone(&dashboard);
                async move {
                    let reopened = dashboard.live.reconnect().await;
                    if reopened > 0 {
                        tracing::info!("Reopened {} live feed(s)", reopened);
                    }
                }
            }));
            for target in Target::ALL {
                let dashboard = Arc::clone(&dashboard);
                let metrics = metrics.clone();
                tasks.push(tokio::spawn(async move {
                    let start = Instant::now();
                    let outcome = dashboard.poll(target).await;
                    metrics.record_poll(target.name(), outcome, start.elapsed());
                    tracing::trace!("Polled {} -> {}", target.name(), outcome);
                }));
            }
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::error!("Poll task failed: {}", e);
                }
            }

            metrics.update_cache_counters(&dashboard.cache_counters());
            metrics.set_suppressed(dashboard.suppressed().await);
            for feed in Feed::ALL {
                metrics.set_live_events(feed.name(), dashboard.live.events_received(feed));
            }

            let elapsed = cycle_start.elapsed();
            metrics.record_cycle_duration(elapsed);
            tracing::debug!("Poll cycle {} completed in {:?}", cycle, elapsed);
        }
    })
}
