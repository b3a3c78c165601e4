// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Request coalescing with a freshness window
//!
//! Every key has at most one load in flight. Callers arriving while a load
//! runs join it through a [`Shared`] future, callers arriving inside the
//! freshness window get the cached value. Loads run on their own task, so a
//! caller that stops waiting never cancels the load for the others.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;

use crate::error::ApiError;

type SharedLoad<V> = Shared<BoxFuture<'static, Fetched<V>>>;
type Entries<V> = Arc<Mutex<HashMap<String, CacheEntry<V>>>>;

struct CacheEntry<V> {
    value: Option<V>,
    last_fetched_at: Option<Instant>,
    in_flight: Option<SharedLoad<V>>,
    generation: u64,
}

impl<V: Clone> CacheEntry<V> {
    fn empty() -> Self {
        Self {
            value: None,
            last_fetched_at: None,
            in_flight: None,
            generation: 0,
        }
    }

    fn fresh(&self, ttl: Duration) -> Option<V> {
        let fetched_at = self.last_fetched_at?;
        if fetched_at.elapsed() < ttl {
            self.value.clone()
        } else {
            None
        }
    }
}

/// Outcome of one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<V> {
    pub result: Result<V, ApiError>,
    /// The load was invalidated or overwritten before it settled, so the
    /// cache did not keep its result
    pub superseded: bool,
}

impl<V> Fetched<V> {
    fn current(result: Result<V, ApiError>) -> Self {
        Self {
            result,
            superseded: false,
        }
    }
}

enum Lookup<V> {
    Fresh(V),
    Pending(SharedLoad<V>),
}

/// Counters describing how fetches were served
#[derive(Debug, Default)]
pub struct CoalescerStats {
    hits: AtomicU64,
    joins: AtomicU64,
    loads: AtomicU64,
}

impl CoalescerStats {
    /// Fetches answered from a fresh cached value
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Fetches that joined a load already in flight
    pub fn joins(&self) -> u64 {
        self.joins.load(Ordering::Relaxed)
    }

    /// Fetches that started a new load
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

/// Deduplicating, TTL-respecting fetch cache keyed by resource key
pub struct FetchCoalescer<V> {
    entries: Entries<V>,
    // Shared by all keys, so generations never repeat, not even after `clear`
    generations: AtomicU64,
    request_timeout: Duration,
    stats: Arc<CoalescerStats>,
}

impl<V> FetchCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
            request_timeout,
            stats: Arc::new(CoalescerStats::default()),
        }
    }

    /// Returns the value for `key`, loading it at most once per freshness window.
    ///
    /// With `force_refresh` the freshness check is skipped, but a load already
    /// in flight is still joined rather than duplicated. A failed load leaves
    /// the previously cached value in place and hands the same error to every
    /// caller that joined it.
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
        force_refresh: bool,
    ) -> Result<V, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        self.fetch_tracked(key, ttl, loader, force_refresh)
            .await
            .result
    }

    /// Like [`fetch`](Self::fetch), also telling whether the result was
    /// superseded by an `invalidate` or `store` while it loaded
    pub async fn fetch_tracked<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
        force_refresh: bool,
    ) -> Fetched<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        match self.begin(key, ttl, loader, force_refresh).await {
            Lookup::Fresh(value) => Fetched::current(Ok(value)),
            Lookup::Pending(load) => load.await,
        }
    }

    /// Like [`fetch`](Self::fetch), but this caller stops waiting once `cancel`
    /// turns `true`.
    ///
    /// Only this caller gets [`ApiError::Cancelled`]; the load keeps running
    /// for the other waiters and still populates the cache.
    pub async fn fetch_cancellable<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
        force_refresh: bool,
        cancel: &mut watch::Receiver<bool>,
    ) -> Fetched<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        if *cancel.borrow() {
            return Fetched::current(Err(ApiError::Cancelled));
        }

        match self.begin(key, ttl, loader, force_refresh).await {
            Lookup::Fresh(value) => Fetched::current(Ok(value)),
            Lookup::Pending(load) => {
                tokio::select! {
                    fetched = load => fetched,
                    () = cancelled(cancel) => {
                        tracing::trace!("Caller stopped waiting for {}", key);
                        Fetched::current(Err(ApiError::Cancelled))
                    }
                }
            }
        }
    }

    async fn begin<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
        force_refresh: bool,
    ) -> Lookup<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(CacheEntry::empty);

        if !force_refresh {
            if let Some(value) = entry.fresh(ttl) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Serving {} from cache", key);
                return Lookup::Fresh(value);
            }
        }

        if let Some(load) = &entry.in_flight {
            self.stats.joins.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Joining in-flight load for {}", key);
            return Lookup::Pending(load.clone());
        }

        let generation = self.next_generation();
        entry.generation = generation;
        let load = self.spawn_load(key.to_string(), generation, loader());
        entry.in_flight = Some(load.clone());
        self.stats.loads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Started load for {} (generation {})", key, generation);

        Lookup::Pending(load)
    }

    fn spawn_load<Fut>(&self, key: String, generation: u64, load: Fut) -> SharedLoad<V>
    where
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let timeout = self.request_timeout;

        let task = tokio::spawn({
            let entries = Arc::clone(&entries);
            let key = key.clone();
            async move {
                let result = match tokio::time::timeout(timeout, load).await {
                    Ok(result) => result,
                    Err(_) => Err(ApiError::Timeout(timeout)),
                };
                let kept = settle(&entries, &key, generation, &result).await;
                Fetched {
                    result,
                    superseded: !kept,
                }
            }
        });

        async move {
            match task.await {
                Ok(fetched) => fetched,
                Err(e) => {
                    let result = Err(ApiError::Internal(format!("load task for {key} failed: {e}")));
                    let kept = settle(&entries, &key, generation, &result).await;
                    Fetched {
                        result,
                        superseded: !kept,
                    }
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Cached value for `key` regardless of age, without loading
    pub async fn cached(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().await;
        entries.get(key).and_then(|entry| entry.value.clone())
    }

    /// Stores a value obtained outside a load (server push, mutation response).
    ///
    /// Supersedes any load in flight for the key.
    pub async fn store(&self, key: &str, value: V) {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(CacheEntry::empty);
        entry.generation = self.next_generation();
        entry.in_flight = None;
        entry.value = Some(value);
        entry.last_fetched_at = Some(Instant::now());
    }

    /// Drops the cached value and detaches any load in flight.
    ///
    /// The detached load still answers its current waiters, but its result
    /// is not written back.
    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.generation = self.next_generation();
            entry.in_flight = None;
            entry.value = None;
            entry.last_fetched_at = None;
            tracing::debug!("Invalidated {}", key);
        }
    }

    /// Number of keys with a load in flight
    pub async fn in_flight(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.in_flight.is_some()).count()
    }

    /// Drops every entry; loads still in flight are discarded when they settle
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn stats(&self) -> &CoalescerStats {
        &self.stats
    }
}

async fn settle<V: Clone>(
    entries: &Mutex<HashMap<String, CacheEntry<V>>>,
    key: &str,
    generation: u64,
    result: &Result<V, ApiError>,
) -> bool {
    let mut entries = entries.lock().await;
    match entries.get_mut(key) {
        Some(entry) if entry.generation == generation => {
            entry.in_flight = None;
            match result {
                Ok(value) => {
                    entry.value = Some(value.clone());
                    entry.last_fetched_at = Some(Instant::now());
                }
                Err(e) => {
                    tracing::debug!("Load for {} failed, keeping previous value: {}", key, e);
                }
            }
            true
        }
        _ => {
            tracing::debug!(
                "Discarding superseded result for {} (generation {})",
                key,
                generation
            );
            false
        }
    }
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    // A dropped sender can no longer cancel anything.
    if cancel.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
