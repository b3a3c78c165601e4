// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Server-Sent-Events reader
//!
//! Lines are split on `\n` (a trailing `\r` is dropped) and every `data:`
//! line is one event. Comments (`:`) and other fields such as `event:` or
//! `id:` are ignored. Payloads are parsed as JSON when possible and handed
//! over as raw text otherwise.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One decoded event payload
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Json(Value),
    Text(String),
}

impl SseEvent {
    fn parse(payload: &str) -> Self {
        match serde_json::from_str(payload) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(payload.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Incremental decoder fed with raw body chunks
///
/// Chunks may split lines and multi-byte characters anywhere; incomplete
/// input is kept until the rest arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk, returning the events it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            if let Some(event) = decode_line(&line[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a final line left without a terminating newline
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line)
    }
}

fn decode_line(raw: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.strip_suffix('\r').unwrap_or(&line);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() {
        return None;
    }
    Some(SseEvent::parse(data))
}

/// Lifecycle of an [`EventStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Open,
    /// Close requested, reader task not finished yet
    Closing,
    Closed,
}

/// Cancellable event reader running on its own task
pub struct EventStream {
    name: String,
    stop: watch::Sender<bool>,
    finished: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl EventStream {
    /// Starts reading `body`, invoking `on_event` for every decoded event
    pub fn spawn<S, B, E, F>(name: impl Into<String>, body: S, mut on_event: F) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Display + Send + 'static,
        F: FnMut(SseEvent) + Send + 'static,
    {
        let name = name.into();
        let (stop, mut stop_rx) = watch::channel(false);
        let finished = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn({
            let name = name.clone();
            let finished = Arc::clone(&finished);
            async move {
                let mut decoder = SseDecoder::new();
                let mut body = std::pin::pin!(body);
                loop {
                    tokio::select! {
                        // Also fires when the handle is dropped.
                        _ = stop_rx.changed() => {
                            tracing::debug!("Event stream {} closed", name);
                            break;
                        }
                        chunk = body.next() => match chunk {
                            Some(Ok(chunk)) => {
                                for event in decoder.feed(chunk.as_ref()) {
                                    on_event(event);
                                }
                            }
                            Some(Err(e)) => {
                                tracing::warn!("Event stream {} failed: {}", name, e);
                                break;
                            }
                            None => {
                                if let Some(event) = decoder.finish() {
                                    on_event(event);
                                }
                                tracing::debug!("Event stream {} ended", name);
                                break;
                            }
                        }
                    }
                }
                finished.store(true, Ordering::Release);
            }
        });

        Self {
            name,
            stop,
            finished,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the reader. Safe to call any number of times, in any state.
    pub fn close(&self) {
        let already = self.stop.send_replace(true);
        if !already {
            tracing::trace!("Closing event stream {}", self.name);
        }
    }

    pub fn state(&self) -> StreamState {
        if self.finished.load(Ordering::Acquire) || self.task.is_finished() {
            StreamState::Closed
        } else if *self.stop.borrow() {
            StreamState::Closing
        } else {
            StreamState::Open
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == StreamState::Closed
    }

    /// Waits until the reader task has exited
    pub async fn closed(&mut self) {
        if !self.task.is_finished() {
            let _ = (&mut self.task).await;
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.close();
    }
}
