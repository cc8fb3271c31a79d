//! Cache Module
//!
//! Tiered caching: a Redis-backed distributed tier with transparent failover
//! to an in-process TTL store.

mod backend;
mod distributed;
mod entry;
mod facade;
mod failover;
mod memory;
mod pattern;
mod stats;

#[cfg(test)]
mod property_tests;
#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use backend::DistributedBackend;
pub use distributed::RedisBackend;
pub use entry::CacheEntry;
pub use facade::{query_key, Cache, CacheStatsReport, EntityKind, EntityTtls};
pub use failover::{BackendMode, BackendState, FailoverController};
pub use memory::MemoryStore;
pub use pattern::KeyPattern;
pub use stats::{StatsAggregator, StatsSnapshot, Tier};
