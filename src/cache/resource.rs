// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Generic per-domain resource cache
//!
//! Combines the fetch coalescer and the absence tracker behind one client and
//! one mapping function from raw JSON to the domain type.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::{Mutex, watch};

use super::absence::{AbsenceTracker, Presence};
use super::coalescer::{CoalescerStats, FetchCoalescer};
use super::key::ResourceQuery;
use crate::client::ResourceClient;
use crate::config::CachePolicy;
use crate::error::ApiError;

/// Converts a raw backend response into the domain value
pub type Mapper<T> = fn(Value) -> Result<T, ApiError>;

/// Result of one background poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// Fresh (or still-fresh cached) value
    Updated(T),
    /// Suppressed as absent; no request was made
    Skipped,
    /// The answer was overtaken by a newer write or invalidation while it
    /// loaded and must not be applied
    Superseded,
    /// Backend just reported the capability absent
    Absent,
    /// Transient failure, recorded as the key's last error
    Failed(ApiError),
}

impl<T> PollOutcome<T> {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Updated(_) => "updated",
            Self::Skipped => "skipped",
            Self::Superseded => "superseded",
            Self::Absent => "absent",
            Self::Failed(_) => "failed",
        }
    }
}

/// Cached, coalesced, absence-aware access to one domain's resources
pub struct ResourceCache<C, T> {
    name: &'static str,
    client: Arc<C>,
    mapper: Mapper<T>,
    policy: CachePolicy,
    coalescer: FetchCoalescer<T>,
    absence: AbsenceTracker,
    last_errors: Mutex<HashMap<String, ApiError>>,
}

impl<C, T> ResourceCache<C, T>
where
    C: ResourceClient,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, client: Arc<C>, mapper: Mapper<T>, policy: CachePolicy) -> Self {
        Self {
            name,
            client,
            mapper,
            policy,
            coalescer: FetchCoalescer::new(policy.request_timeout),
            absence: AbsenceTracker::new(),
            last_errors: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn loader(&self, query: &ResourceQuery) -> impl FnOnce() -> BoxFuture<'static, Result<T, ApiError>> {
        let client = Arc::clone(&self.client);
        let query = query.clone();
        let mapper = self.mapper;
        move || {
            async move {
                let raw = client.get(query.path(), query.params()).await?;
                mapper(raw)
            }
            .boxed()
        }
    }

    /// Explicit request on behalf of a user action.
    ///
    /// Every failure, capability-absent included, is returned to the caller.
    pub async fn fetch(&self, query: &ResourceQuery, force_refresh: bool) -> Result<T, ApiError> {
        let key = query.key();
        let result = self
            .coalescer
            .fetch(&key, self.policy.ttl, self.loader(query), force_refresh)
            .await;
        self.observe(&key, &result).await;
        result
    }

    /// Explicit request the caller can stop waiting for (navigation away)
    pub async fn fetch_cancellable(
        &self,
        query: &ResourceQuery,
        force_refresh: bool,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<T, ApiError> {
        let key = query.key();
        let result = self
            .coalescer
            .fetch_cancellable(
                &key,
                self.policy.ttl,
                self.loader(query),
                force_refresh,
                cancel,
            )
            .await
            .result;
        self.observe(&key, &result).await;
        result
    }

    /// Background poll: never fails, records the outcome instead.
    pub async fn poll(&self, query: &ResourceQuery) -> PollOutcome<T> {
        let key = query.key();
        if self.absence.should_skip(&key).await {
            tracing::trace!("[{}] {} suppressed, skipping poll", self.name, key);
            return PollOutcome::Skipped;
        }

        let fetched = self
            .coalescer
            .fetch_tracked(&key, self.policy.ttl, self.loader(query), false)
            .await;
        self.observe(&key, &fetched.result).await;

        match fetched.result {
            Ok(_) if fetched.superseded => {
                tracing::debug!("[{}] {} changed while polling, dropping answer", self.name, key);
                PollOutcome::Superseded
            }
            Ok(value) => PollOutcome::Updated(value),
            Err(e) if e.is_capability_absent() => {
                tracing::info!(
                    "[{}] {} reported absent, pausing polls for {:?}",
                    self.name,
                    key,
                    self.policy.absent_ttl
                );
                PollOutcome::Absent
            }
            Err(e) => {
                tracing::warn!("[{}] poll of {} failed: {}", self.name, key, e);
                PollOutcome::Failed(e)
            }
        }
    }

    async fn observe(&self, key: &str, result: &Result<T, ApiError>) {
        match result {
            Ok(_) => {
                self.absence.record_present(key).await;
                self.last_errors.lock().await.remove(key);
            }
            Err(e) if e.is_capability_absent() => {
                self.absence.mark_absent(key, self.policy.absent_ttl).await;
                self.coalescer.invalidate(key).await;
                self.last_errors.lock().await.remove(key);
            }
            Err(ApiError::Cancelled) => {}
            Err(e) => {
                self.last_errors
                    .lock()
                    .await
                    .insert(key.to_string(), e.clone());
            }
        }
    }

    /// Last known value, regardless of age
    pub async fn value(&self, query: &ResourceQuery) -> Option<T> {
        self.coalescer.cached(&query.key()).await
    }

    /// Error of the most recent failed request for `query`, cleared on success
    pub async fn last_error(&self, query: &ResourceQuery) -> Option<ApiError> {
        self.last_errors.lock().await.get(&query.key()).cloned()
    }

    pub async fn presence(&self, query: &ResourceQuery) -> Presence {
        self.absence.presence(&query.key()).await
    }

    /// Writes a value obtained outside a poll (live event, mutation response)
    pub async fn store(&self, query: &ResourceQuery, value: T) {
        let key = query.key();
        self.coalescer.store(&key, value).await;
        self.absence.record_present(&key).await;
    }

    pub async fn invalidate(&self, query: &ResourceQuery) {
        self.coalescer.invalidate(&query.key()).await;
    }

    /// Removes expired absence markers
    pub async fn sweep(&self) -> usize {
        self.absence.purge_expired().await
    }

    pub async fn suppressed(&self) -> usize {
        self.absence.suppressed().await
    }

    pub fn stats(&self) -> &CoalescerStats {
        self.coalescer.stats()
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }
}

/// Deserializes the raw value with serde
pub fn from_json<T: serde::de::DeserializeOwned>(raw: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeClient;
    use std::time::Duration;

    const POWER: &str = "/api/v1/hardware/power";

    fn policy() -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(5),
            absent_ttl: Duration::from_secs(60),
            request_timeout: Duration::from_secs(15),
        }
    }

    fn cache(client: &Arc<FakeClient>) -> ResourceCache<FakeClient, Value> {
        ResourceCache::new("hardware", Arc::clone(client), Ok, policy())
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_resource_is_suppressed_for_ttl() {
        let client = Arc::new(FakeClient::new());
        client.respond_err(POWER, ApiError::status(503, "no UPS"));
        let power = cache(&client);
        let query = ResourceQuery::new(POWER);

        // Poll every 10 s: the first poll marks the resource absent.
        assert_eq!(power.poll(&query).await, PollOutcome::Absent);
        assert_eq!(power.value(&query).await, None);
        assert_eq!(power.last_error(&query).await, None);

        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(10)).await;
            assert_eq!(power.poll(&query).await, PollOutcome::Skipped);
        }
        assert_eq!(client.calls(POWER), 1);

        client.respond(POWER, serde_json::json!({ "on_battery": false }));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(matches!(power.poll(&query).await, PollOutcome::Updated(_)));
        assert_eq!(client.calls(POWER), 2);
        assert_eq!(power.presence(&query).await, Presence::Present);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_not_suppressed() {
        let client = Arc::new(FakeClient::new());
        client.respond_err(POWER, ApiError::status(500, "internal"));
        let power = cache(&client);
        let query = ResourceQuery::new(POWER);

        let outcome = power.poll(&query).await;

        assert_eq!(outcome, PollOutcome::Failed(ApiError::status(500, "internal")));
        assert_eq!(power.presence(&query).await, Presence::Unknown);
        assert_eq!(
            power.last_error(&query).await,
            Some(ApiError::status(500, "internal"))
        );

        tokio::time::advance(Duration::from_secs(10)).await;
        let _ = power.poll(&query).await;
        assert_eq!(client.calls(POWER), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_fetch_surfaces_absence() {
        let client = Arc::new(FakeClient::new());
        client.respond_err(POWER, ApiError::status(501, "not supported"));
        let power = cache(&client);
        let query = ResourceQuery::new(POWER);

        let err = power.fetch(&query, false).await.unwrap_err();

        assert!(err.is_capability_absent());
        assert_eq!(power.presence(&query).await, Presence::Suppressed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_last_error() {
        let client = Arc::new(FakeClient::new());
        client.respond_err(POWER, ApiError::Transport("refused".into()));
        let power = cache(&client);
        let query = ResourceQuery::new(POWER);

        let _ = power.poll(&query).await;
        assert!(power.last_error(&query).await.is_some());

        client.respond(POWER, serde_json::json!({}));
        let _ = power.poll(&query).await;
        assert!(power.last_error(&query).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mapper_failure_is_a_decode_error() {
        let client = Arc::new(FakeClient::new());
        client.respond(POWER, serde_json::json!("not an object"));
        let power: ResourceCache<FakeClient, HashMap<String, u32>> =
            ResourceCache::new("hardware", client, from_json, policy());

        let outcome = power.poll(&ResourceQuery::new(POWER)).await;

        assert!(matches!(outcome, PollOutcome::Failed(ApiError::Decode(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fetch_still_fills_the_cache() {
        let client = Arc::new(FakeClient::new());
        client.respond(POWER, serde_json::json!({ "on_battery": true }));
        client.set_delay(Duration::from_millis(100));
        let power = cache(&client);
        let query = ResourceQuery::new(POWER);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let navigate_away = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel_tx.send(true).unwrap();
        };
        let (result, ()) = tokio::join!(
            power.fetch_cancellable(&query, false, &mut cancel_rx),
            navigate_away,
        );

        assert_eq!(result, Err(ApiError::Cancelled));
        assert_eq!(power.last_error(&query).await, None);
        assert_eq!(power.presence(&query).await, Presence::Unknown);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            power.value(&query).await,
            Some(serde_json::json!({ "on_battery": true }))
        );
        assert_eq!(power.last_error(&query).await, None);
        assert_eq!(client.calls(POWER), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_overtaken_by_invalidate_is_superseded() {
        let client = Arc::new(FakeClient::new());
        client.respond(POWER, serde_json::json!({ "on_battery": false }));
        client.set_delay(Duration::from_millis(100));
        let power = cache(&client);
        let query = ResourceQuery::new(POWER);

        let invalidate_soon = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            power.invalidate(&query).await;
        };
        let (outcome, ()) = tokio::join!(power.poll(&query), invalidate_soon);

        assert_eq!(outcome, PollOutcome::Superseded);
        assert_eq!(power.value(&query).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_marks_value_fresh() {
        let client = Arc::new(FakeClient::new());
        let power = cache(&client);
        let query = ResourceQuery::new(POWER);

        power.store(&query, serde_json::json!({ "pushed": true })).await;
        let fetched = power.fetch(&query, false).await.unwrap();

        assert_eq!(fetched, serde_json::json!({ "pushed": true }));
        assert_eq!(client.calls(POWER), 0);
    }
}
