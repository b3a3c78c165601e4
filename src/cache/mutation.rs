// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Optimistic mutations with per-key rollback
//!
//! The visible state is a keyed map. A mutation applies its local change at
//! once, then waits for the backend: success commits (a value returned by the
//! backend wins over the local guess), failure restores the value the key had
//! before. A key with a mutation pending refuses a second one.
//!
//! Critical sections never span an `.await`, so a plain `std` mutex guards
//! the map and the local change is applied synchronously.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ApiError;

/// Lifecycle of the latest mutation on one subject key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<V> {
    Idle,
    Pending { previous: Option<V> },
    Committed,
    RolledBack { previous: Option<V> },
}

impl<V> MutationState<V> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

struct Inner<V> {
    values: BTreeMap<String, V>,
    mutations: HashMap<String, MutationState<V>>,
    commits: u64,
}

impl<V: Clone> Inner<V> {
    fn reconcile(&mut self, values: impl IntoIterator<Item = (String, V)>) {
        let mut next: BTreeMap<String, V> = values.into_iter().collect();
        for (key, state) in &self.mutations {
            if !state.is_pending() {
                continue;
            }
            match self.values.get(key) {
                Some(value) => {
                    next.insert(key.clone(), value.clone());
                }
                None => {
                    next.remove(key);
                }
            }
        }
        self.values = next;
    }
}

/// Keyed visible state with optimistic, rollback-on-failure mutations
pub struct OptimisticStore<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> Default for OptimisticStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> OptimisticStore<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                values: BTreeMap::new(),
                mutations: HashMap::new(),
                commits: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one optimistic mutation on `key`.
    ///
    /// `apply_local` receives the current value and returns the new one
    /// (`None` removes the key). `confirm_remote` performs the single backend
    /// call; `Ok(Some(v))` is authoritative and replaces the local guess.
    ///
    /// Returns `Ok(false)` without touching anything when a mutation on `key`
    /// is already pending, `Ok(true)` once committed, and the backend error
    /// after the key has been restored.
    ///
    /// Dropping the returned future before it settles also restores the key.
    pub async fn mutate<A, F, Fut>(
        &self,
        key: &str,
        apply_local: A,
        confirm_remote: F,
    ) -> Result<bool, ApiError>
    where
        A: FnOnce(Option<&V>) -> Option<V>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, ApiError>>,
    {
        {
            let mut inner = self.lock();
            if inner.mutations.get(key).is_some_and(MutationState::is_pending) {
                tracing::debug!("Mutation on {} already pending, ignoring", key);
                return Ok(false);
            }

            let previous = inner.values.get(key).cloned();
            match apply_local(previous.as_ref()) {
                Some(value) => {
                    inner.values.insert(key.to_string(), value);
                }
                None => {
                    inner.values.remove(key);
                }
            }
            inner
                .mutations
                .insert(key.to_string(), MutationState::Pending { previous });
        }

        let mut guard = PendingGuard {
            store: self,
            key,
            armed: true,
        };
        let outcome = confirm_remote().await;
        guard.armed = false;

        match outcome {
            Ok(authoritative) => {
                self.commit(key, authoritative);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("Mutation on {} rejected, rolling back: {}", key, e);
                self.roll_back(key);
                Err(e)
            }
        }
    }

    fn commit(&self, key: &str, authoritative: Option<V>) {
        let mut inner = self.lock();
        if let Some(value) = authoritative {
            inner.values.insert(key.to_string(), value);
        }
        inner
            .mutations
            .insert(key.to_string(), MutationState::Committed);
        inner.commits += 1;
        tracing::debug!("Mutation on {} committed", key);
    }

    fn roll_back(&self, key: &str) {
        let mut inner = self.lock();
        let previous = match inner.mutations.remove(key) {
            Some(MutationState::Pending { previous }) => previous,
            other => {
                // Nothing pending means nothing to restore.
                if let Some(state) = other {
                    inner.mutations.insert(key.to_string(), state);
                }
                return;
            }
        };

        match &previous {
            Some(value) => {
                inner.values.insert(key.to_string(), value.clone());
            }
            None => {
                inner.values.remove(key);
            }
        }
        inner
            .mutations
            .insert(key.to_string(), MutationState::RolledBack { previous });
    }

    /// Reconciles the visible state with a full listing from the backend.
    ///
    /// Keys with a mutation still pending keep their optimistic value.
    pub fn replace_all(&self, values: impl IntoIterator<Item = (String, V)>) {
        self.lock().reconcile(values);
    }

    /// Number of mutations committed so far
    pub fn commits(&self) -> u64 {
        self.lock().commits
    }

    /// Like [`replace_all`](Self::replace_all), for a listing requested when
    /// [`commits`](Self::commits) returned `since`.
    ///
    /// A mutation committed after that may be missing from the listing, so
    /// the listing is dropped and `false` returned.
    pub fn replace_all_since(
        &self,
        since: u64,
        values: impl IntoIterator<Item = (String, V)>,
    ) -> bool {
        let mut inner = self.lock();
        if inner.commits != since {
            return false;
        }
        inner.reconcile(values);
        true
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().values.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().values.contains_key(key)
    }

    pub fn snapshot(&self) -> BTreeMap<String, V> {
        self.lock().values.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().values.keys().cloned().collect()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock()
            .mutations
            .get(key)
            .is_some_and(MutationState::is_pending)
    }

    pub fn state(&self, key: &str) -> MutationState<V> {
        self.lock()
            .mutations
            .get(key)
            .cloned()
            .unwrap_or(MutationState::Idle)
    }
}

/// Restores the key if the mutation future is dropped mid-flight
struct PendingGuard<'a, V: Clone> {
    store: &'a OptimisticStore<V>,
    key: &'a str,
    armed: bool,
}

impl<V: Clone> Drop for PendingGuard<'_, V> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Mutation on {} abandoned, rolling back", self.key);
            self.store.roll_back(self.key);
        }
    }
}
