// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Per-domain stores and the dashboard session that owns them

mod apps;
mod hardware;
mod live;
mod system;
mod types;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::cache::{Presence, ResourceCache, ResourceQuery};
use crate::client::ResourceClient;
use crate::config::CachePolicy;

pub use apps::{APPS_PATH, AppsStore, FAVORITES_PATH};
pub use hardware::{GPIO_PATH, HardwareStore, POWER_PATH};
pub use live::{Feed, LiveFeeds};
pub use system::{NETWORK_PATH, STATS_PATH, STORAGE_PATH, SystemStore};
pub use types::{
    App, GpioPin, NetworkInterface, NetworkStatus, PowerStatus, StorageDisk, SystemStats,
};

/// One polled resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Apps,
    Favorites,
    Power,
    Gpio,
    Stats,
    Network,
    Storage,
}

impl Target {
    pub const ALL: [Target; 7] = [
        Target::Apps,
        Target::Favorites,
        Target::Power,
        Target::Gpio,
        Target::Stats,
        Target::Network,
        Target::Storage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Apps => "apps",
            Self::Favorites => "favorites",
            Self::Power => "power",
            Self::Gpio => "gpio",
            Self::Stats => "stats",
            Self::Network => "network",
            Self::Storage => "storage",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Apps => APPS_PATH,
            Self::Favorites => FAVORITES_PATH,
            Self::Power => POWER_PATH,
            Self::Gpio => GPIO_PATH,
            Self::Stats => STATS_PATH,
            Self::Network => NETWORK_PATH,
            Self::Storage => STORAGE_PATH,
        }
    }
}

/// Coalescer counters of one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCounters {
    pub target: Target,
    pub hits: u64,
    pub joins: u64,
    pub loads: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatus {
    pub name: &'static str,
    pub presence: Presence,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveSnapshot {
    pub monitoring: Option<Value>,
    pub communication: Option<Value>,
    pub events_received: u64,
}

/// Everything the UI renders, as one JSON document
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub apps: Vec<App>,
    pub running_apps: usize,
    pub favorites: Vec<String>,
    pub power: Option<PowerStatus>,
    pub gpio: Vec<GpioPin>,
    pub stats: Option<SystemStats>,
    pub memory_percent: Option<f64>,
    pub network: Option<NetworkStatus>,
    pub disks: Vec<StorageDisk>,
    pub live: LiveSnapshot,
    pub resources: Vec<ResourceStatus>,
}

/// Session container: one per dashboard session, client injected
pub struct Dashboard<C> {
    pub apps: AppsStore<C>,
    pub hardware: HardwareStore<C>,
    pub system: SystemStore<C>,
    pub live: LiveFeeds<C>,
    live_stats: Mutex<watch::Receiver<Option<SystemStats>>>,
}

impl<C: ResourceClient> Dashboard<C> {
    pub fn new(client: Arc<C>, policy: CachePolicy) -> Self {
        let live = LiveFeeds::new(Arc::clone(&client));
        let live_stats = Mutex::new(live.live_stats());
        Self {
            apps: AppsStore::new(Arc::clone(&client), policy),
            hardware: HardwareStore::new(Arc::clone(&client), policy),
            system: SystemStore::new(client, policy),
            live,
            live_stats,
        }
    }

    /// Polls one resource, returning the outcome label
    pub async fn poll(&self, target: Target) -> &'static str {
        match target {
            Target::Apps => self.apps.poll_apps().await.label(),
            Target::Favorites => self.apps.poll_favorites().await.label(),
            Target::Power => self.hardware.poll_power().await.label(),
            Target::Gpio => self.hardware.poll_gpio().await.label(),
            Target::Stats => {
                self.sync_live_stats().await;
                self.system.poll_stats().await.label()
            }
            Target::Network => self.system.poll_network().await.label(),
            Target::Storage => self.system.poll_storage().await.label(),
        }
    }

    /// Moves stats pushed by the monitoring feed into the stats cache
    pub async fn sync_live_stats(&self) -> bool {
        let pushed = {
            let mut rx = self
                .live_stats
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let changed = rx.has_changed().unwrap_or(false);
            let value = if changed {
                rx.borrow_and_update().clone()
            } else {
                None
            };
            value
        };
        match pushed {
            Some(stats) => {
                self.system.push_stats(stats).await;
                true
            }
            None => false,
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let stats = self.system.stats().await;
        DashboardSnapshot {
            apps: self.apps.apps().await,
            running_apps: self.apps.running_count().await,
            favorites: self.apps.favorites(),
            power: self.hardware.power().await,
            gpio: self.hardware.gpio().await,
            memory_percent: stats.as_ref().map(SystemStats::memory_percent),
            stats,
            network: self.system.network().await,
            disks: self.system.disks().await,
            live: LiveSnapshot {
                monitoring: self.live.latest_json(Feed::Monitoring),
                communication: self.live.latest_json(Feed::Communication),
                events_received: Feed::ALL
                    .iter()
                    .map(|feed| self.live.events_received(*feed))
                    .sum(),
            },
            resources: self.resources().await,
        }
    }

    async fn resources(&self) -> Vec<ResourceStatus> {
        vec![
            status(self.apps.apps_cache(), APPS_PATH).await,
            status(self.apps.favorites_cache(), FAVORITES_PATH).await,
            status(self.hardware.power_cache(), POWER_PATH).await,
            status(self.hardware.gpio_cache(), GPIO_PATH).await,
            status(self.system.stats_cache(), STATS_PATH).await,
            status(self.system.network_cache(), NETWORK_PATH).await,
            status(self.system.storage_cache(), STORAGE_PATH).await,
        ]
    }

    /// Purges expired absence markers across all stores
    pub async fn sweep(&self) -> usize {
        self.apps.apps_cache().sweep().await
            + self.apps.favorites_cache().sweep().await
            + self.hardware.power_cache().sweep().await
            + self.hardware.gpio_cache().sweep().await
            + self.system.stats_cache().sweep().await
            + self.system.network_cache().sweep().await
            + self.system.storage_cache().sweep().await
    }

    /// Resources currently suppressed as absent
    pub async fn suppressed(&self) -> usize {
        self.apps.apps_cache().suppressed().await
            + self.apps.favorites_cache().suppressed().await
            + self.hardware.power_cache().suppressed().await
            + self.hardware.gpio_cache().suppressed().await
            + self.system.stats_cache().suppressed().await
            + self.system.network_cache().suppressed().await
            + self.system.storage_cache().suppressed().await
    }

    pub fn cache_counters(&self) -> Vec<CacheCounters> {
        Target::ALL
            .iter()
            .map(|target| {
                let stats = match target {
                    Target::Apps => self.apps.apps_cache().stats(),
                    Target::Favorites => self.apps.favorites_cache().stats(),
                    Target::Power => self.hardware.power_cache().stats(),
                    Target::Gpio => self.hardware.gpio_cache().stats(),
                    Target::Stats => self.system.stats_cache().stats(),
                    Target::Network => self.system.network_cache().stats(),
                    Target::Storage => self.system.storage_cache().stats(),
                };
                CacheCounters {
                    target: *target,
                    hits: stats.hits(),
                    joins: stats.joins(),
                    loads: stats.loads(),
                }
            })
            .collect()
    }
}

async fn status<C, T>(cache: &ResourceCache<C, T>, path: &str) -> ResourceStatus
where
    C: ResourceClient,
    T: Clone + Send + Sync + 'static,
{
    let query = ResourceQuery::new(path);
    ResourceStatus {
        name: cache.name(),
        presence: cache.presence(&query).await,
        last_error: cache.last_error(&query).await.map(|e| e.to_string()),
    }
}
