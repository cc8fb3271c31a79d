//! Cache Statistics Module
//!
//! Tracks hits, misses, writes and deletes, and which tier answered each read.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Tier ==
/// Storage tier that answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// The networked cache server
    Distributed,
    /// The in-process memory store
    Fallback,
}

// == Stats Aggregator ==
/// Lock-free counters shared by every request.
///
/// No invariant spans more than one counter, so each is an independent atomic.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    distributed_hits: AtomicU64,
    fallback_hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

impl StatsAggregator {
    // == Constructor ==
    /// Creates a new aggregator with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Counts a hit served by `tier`.
    pub fn record_hit(&self, tier: Tier) {
        match tier {
            Tier::Distributed => self.distributed_hits.fetch_add(1, Ordering::Relaxed),
            Tier::Fallback => self.fallback_hits.fetch_add(1, Ordering::Relaxed),
        };
    }

    // == Record Miss ==
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Set ==
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Delete ==
    /// Adds `count` removed entries to the delete counter.
    pub fn record_delete(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the current counters into an immutable view.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            distributed_hits: self.distributed_hits.load(Ordering::Relaxed),
            fallback_hits: self.fallback_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time copy of the aggregator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub distributed_hits: u64,
    pub fallback_hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
}

impl StatsSnapshot {
    /// Hits across both tiers.
    pub fn hits(&self) -> u64 {
        self.distributed_hits + self.fallback_hits
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}
