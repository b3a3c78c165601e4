// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! System stats, network status and storage

use std::sync::Arc;

use crate::cache::{PollOutcome, ResourceCache, ResourceQuery, from_json};
use crate::client::ResourceClient;
use crate::config::CachePolicy;

use super::types::{NetworkStatus, StorageDisk, SystemStats, parse_disks};

pub const STATS_PATH: &str = "/api/v1/system/stats";
pub const NETWORK_PATH: &str = "/api/v1/network/status";
pub const STORAGE_PATH: &str = "/api/v1/storage/disks";

pub struct SystemStore<C> {
    stats: ResourceCache<C, SystemStats>,
    network: ResourceCache<C, NetworkStatus>,
    storage: ResourceCache<C, Vec<StorageDisk>>,
}

impl<C: ResourceClient> SystemStore<C> {
    pub fn new(client: Arc<C>, policy: CachePolicy) -> Self {
        Self {
            stats: ResourceCache::new("system", Arc::clone(&client), from_json, policy),
            network: ResourceCache::new("network", Arc::clone(&client), from_json, policy),
            storage: ResourceCache::new("storage", client, parse_disks, policy),
        }
    }

    pub async fn poll_stats(&self) -> PollOutcome<SystemStats> {
        self.stats.poll(&ResourceQuery::new(STATS_PATH)).await
    }

    pub async fn poll_network(&self) -> PollOutcome<NetworkStatus> {
        self.network.poll(&ResourceQuery::new(NETWORK_PATH)).await
    }

    pub async fn poll_storage(&self) -> PollOutcome<Vec<StorageDisk>> {
        self.storage.poll(&ResourceQuery::new(STORAGE_PATH)).await
    }

    /// Stores stats pushed by the monitoring stream
    pub async fn push_stats(&self, stats: SystemStats) {
        self.stats.store(&ResourceQuery::new(STATS_PATH), stats).await;
    }

    pub async fn stats(&self) -> Option<SystemStats> {
        self.stats.value(&ResourceQuery::new(STATS_PATH)).await
    }

    pub async fn network(&self) -> Option<NetworkStatus> {
        self.network.value(&ResourceQuery::new(NETWORK_PATH)).await
    }

    pub async fn disks(&self) -> Vec<StorageDisk> {
        self.storage
            .value(&ResourceQuery::new(STORAGE_PATH))
            .await
            .unwrap_or_default()
    }

    /// Used and total bytes summed over all disks
    pub async fn storage_usage(&self) -> (u64, u64) {
        self.disks().await.iter().fold((0, 0), |(used, total), disk| {
            (used + disk.used_bytes, total + disk.total_bytes)
        })
    }

    pub async fn is_online(&self) -> bool {
        self.network().await.is_some_and(|status| status.internet)
    }

    pub fn stats_cache(&self) -> &ResourceCache<C, SystemStats> {
        &self.stats
    }

    pub fn network_cache(&self) -> &ResourceCache<C, NetworkStatus> {
        &self.network
    }

    pub fn storage_cache(&self) -> &ResourceCache<C, Vec<StorageDisk>> {
        &self.storage
    }
}
