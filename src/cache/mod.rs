// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Client-side resource cache
//!
//! - `coalescer`: one load per key at a time, freshness window, timeouts
//! - `mutation`: optimistic updates with per-key rollback
//! - `absence`: suppression of resources reported absent
//! - `resource`: the three combined behind a client and a mapping function

mod absence;
mod coalescer;
mod key;
mod mutation;
mod resource;

pub use absence::{AbsenceTracker, Presence};
pub use coalescer::{CoalescerStats, FetchCoalescer, Fetched};
pub use key::ResourceQuery;
pub use mutation::{MutationState, OptimisticStore};
pub use resource::{Mapper, PollOutcome, ResourceCache, from_json};
