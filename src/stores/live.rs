// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Live SSE feeds: resource monitoring and mesh communication

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::client::{EventStream, ResourceClient, SseEvent, StreamState};
use crate::error::ApiError;

use super::types::SystemStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    Monitoring,
    Communication,
}

impl Feed {
    pub const ALL: [Feed; 2] = [Feed::Monitoring, Feed::Communication];

    pub fn path(self) -> &'static str {
        match self {
            Self::Monitoring => "/api/v1/monitoring/stream",
            Self::Communication => "/api/v1/communication/events",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Monitoring => "monitoring",
            Self::Communication => "communication",
        }
    }
}

#[derive(Default)]
struct FeedState {
    latest: Mutex<HashMap<Feed, SseEvent>>,
    received: [AtomicU64; 2],
}

fn slot(feed: Feed) -> usize {
    match feed {
        Feed::Monitoring => 0,
        Feed::Communication => 1,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stats frames arrive either bare or wrapped as `{"stats": {...}}`
fn stats_from_event(event: &SseEvent) -> Option<SystemStats> {
    let value = event.as_json()?;
    let stats = value.get("stats").unwrap_or(value);
    if !stats.as_object()?.contains_key("cpu_percent") {
        return None;
    }
    serde_json::from_value(stats.clone()).ok()
}

/// Open live streams and the latest event seen on each
pub struct LiveFeeds<C> {
    client: Arc<C>,
    streams: Mutex<HashMap<Feed, EventStream>>,
    // Feeds opened and not closed since; `reconnect` keeps these alive
    wanted: Mutex<HashSet<Feed>>,
    state: Arc<FeedState>,
    stats_tx: Arc<watch::Sender<Option<SystemStats>>>,
}

impl<C: ResourceClient> LiveFeeds<C> {
    pub fn new(client: Arc<C>) -> Self {
        let (stats_tx, _) = watch::channel(None);
        Self {
            client,
            streams: Mutex::new(HashMap::new()),
            wanted: Mutex::new(HashSet::new()),
            state: Arc::new(FeedState::default()),
            stats_tx: Arc::new(stats_tx),
        }
    }

    /// Subscribes to `feed`, replacing (and closing) a previous stream
    pub async fn open(&self, feed: Feed) -> Result<(), ApiError> {
        lock(&self.wanted).insert(feed);
        let state = Arc::clone(&self.state);
        let stats_tx = Arc::clone(&self.stats_tx);

        let stream = self
            .client
            .subscribe(feed.path(), move |event| {
                if feed == Feed::Monitoring {
                    if let Some(stats) = stats_from_event(&event) {
                        stats_tx.send_replace(Some(stats));
                    }
                }
                state.received[slot(feed)].fetch_add(1, Ordering::Relaxed);
                lock(&state.latest).insert(feed, event);
            })
            .await?;

        tracing::info!("Live feed {} opened", feed.name());
        lock(&self.streams).insert(feed, stream);
        Ok(())
    }

    /// Opens every feed; a failing feed is logged and left closed
    pub async fn open_all(&self) -> usize {
        let mut opened = 0;
        for feed in Feed::ALL {
            match self.open(feed).await {
                Ok(()) => opened += 1,
                Err(e) => tracing::warn!("Failed to open live feed {}: {}", feed.name(), e),
            }
        }
        opened
    }

    /// Reopens wanted feeds whose stream ended, failed or never opened
    pub async fn reconnect(&self) -> usize {
        let mut reopened = 0;
        for feed in Feed::ALL {
            let wanted = lock(&self.wanted).contains(&feed);
            if !wanted || self.state(feed) != StreamState::Closed {
                continue;
            }
            match self.open(feed).await {
                Ok(()) => reopened += 1,
                Err(e) => tracing::debug!("Live feed {} still unavailable: {}", feed.name(), e),
            }
        }
        reopened
    }

    pub fn close(&self, feed: Feed) {
        lock(&self.wanted).remove(&feed);
        if let Some(stream) = lock(&self.streams).get(&feed) {
            stream.close();
        }
    }

    pub fn close_all(&self) {
        lock(&self.wanted).clear();
        for stream in lock(&self.streams).values() {
            stream.close();
        }
    }

    /// Closes every feed and waits for the readers to exit
    pub async fn shutdown(&self) {
        lock(&self.wanted).clear();
        let streams: Vec<EventStream> = lock(&self.streams).drain().map(|(_, s)| s).collect();
        for mut stream in streams {
            stream.close();
            stream.closed().await;
        }
    }

    pub fn state(&self, feed: Feed) -> StreamState {
        lock(&self.streams)
            .get(&feed)
            .map_or(StreamState::Closed, EventStream::state)
    }

    pub fn latest(&self, feed: Feed) -> Option<SseEvent> {
        lock(&self.state.latest).get(&feed).cloned()
    }

    /// Latest payload as JSON; text payloads become JSON strings
    pub fn latest_json(&self, feed: Feed) -> Option<Value> {
        self.latest(feed).map(|event| match event {
            SseEvent::Json(value) => value,
            SseEvent::Text(text) => Value::String(text),
        })
    }

    pub fn events_received(&self, feed: Feed) -> u64 {
        self.state.received[slot(feed)].load(Ordering::Relaxed)
    }

    /// Stats pushed by the monitoring feed
    pub fn live_stats(&self) -> watch::Receiver<Option<SystemStats>> {
        self.stats_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeClient;

    async fn wait_for(feeds: &LiveFeeds<FakeClient>, feed: Feed, count: u64) {
        for _ in 0..100 {
            if feeds.events_received(feed) >= count && feeds.state(feed) == StreamState::Closed {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("feed {} did not deliver {count} events", feed.name());
    }

    #[tokio::test]
    async fn test_monitoring_feed_publishes_stats() {
        let client = Arc::new(FakeClient::new());
        client.stream(
            Feed::Monitoring.path(),
            &[
                "data: {\"cpu_percent\": 12.5, \"memory_used\": 1}\n",
                "data: {\"stats\": {\"cpu_percent\": 30.0}}\n",
            ],
        );
        let feeds = LiveFeeds::new(client);
        let stats = feeds.live_stats();

        feeds.open(Feed::Monitoring).await.unwrap();
        wait_for(&feeds, Feed::Monitoring, 2).await;

        assert_eq!(stats.borrow().as_ref().map(|s| s.cpu_percent), Some(30.0));
        assert_eq!(
            feeds.latest_json(Feed::Monitoring),
            Some(serde_json::json!({ "stats": { "cpu_percent": 30.0 } }))
        );
    }

    #[tokio::test]
    async fn test_communication_text_events() {
        let client = Arc::new(FakeClient::new());
        client.stream(Feed::Communication.path(), &["data: node joined\n"]);
        let feeds = LiveFeeds::new(client);

        feeds.open(Feed::Communication).await.unwrap();
        wait_for(&feeds, Feed::Communication, 1).await;

        assert_eq!(
            feeds.latest(Feed::Communication),
            Some(SseEvent::Text("node joined".to_string()))
        );
        assert!(feeds.live_stats().borrow().is_none());
    }

    #[tokio::test]
    async fn test_open_all_skips_failing_feed() {
        let client = Arc::new(FakeClient::new());
        client.stream(Feed::Communication.path(), &[]);
        let feeds = LiveFeeds::new(client);

        assert_eq!(feeds.open_all().await, 1);
        assert_eq!(feeds.state(Feed::Monitoring), StreamState::Closed);
    }

    #[tokio::test]
    async fn test_reconnect_reopens_ended_feed() {
        let client = Arc::new(FakeClient::new());
        client.stream(Feed::Communication.path(), &["data: node joined\n"]);
        let feeds = LiveFeeds::new(client);

        feeds.open(Feed::Communication).await.unwrap();
        wait_for(&feeds, Feed::Communication, 1).await;

        assert_eq!(feeds.reconnect().await, 1);
        wait_for(&feeds, Feed::Communication, 2).await;
        assert_eq!(feeds.events_received(Feed::Communication), 2);
    }

    #[tokio::test]
    async fn test_reconnect_retries_feed_that_failed_to_open() {
        let client = Arc::new(FakeClient::new());
        let feeds = LiveFeeds::new(Arc::clone(&client));

        assert!(feeds.open(Feed::Monitoring).await.is_err());
        assert_eq!(feeds.reconnect().await, 0);

        client.stream(Feed::Monitoring.path(), &["data: {\"cpu_percent\": 3.0}\n"]);
        assert_eq!(feeds.reconnect().await, 1);
        wait_for(&feeds, Feed::Monitoring, 1).await;
    }

    #[tokio::test]
    async fn test_closed_feed_is_not_reconnected() {
        let client = Arc::new(FakeClient::new());
        client.stream(Feed::Communication.path(), &["data: hello\n"]);
        let feeds = LiveFeeds::new(client);

        feeds.open(Feed::Communication).await.unwrap();
        wait_for(&feeds, Feed::Communication, 1).await;
        feeds.close(Feed::Communication);

        assert_eq!(feeds.reconnect().await, 0);
        assert_eq!(feeds.events_received(Feed::Communication), 1);
    }

    #[tokio::test]
    async fn test_close_unopened_feed_is_noop() {
        let feeds = LiveFeeds::new(Arc::new(FakeClient::new()));
        feeds.close(Feed::Monitoring);
        feeds.close_all();
        feeds.shutdown().await;
        assert_eq!(feeds.events_received(Feed::Monitoring), 0);
    }
}
