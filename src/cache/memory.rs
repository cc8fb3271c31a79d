//! Memory Store Module
//!
//! In-process TTL store. This is the tier that never fails: every write is
//! accepted and every read answers from local memory.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, KeyPattern};

/// Entries removed per write-lock acquisition during a purge.
const PURGE_BATCH_SIZE: usize = 256;

// == Memory Store ==
/// Key/value map with per-entry expiry, guarded by a single lock.
///
/// Expiry is enforced on read, so correctness does not depend on the
/// sweeper having run.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a value, replacing any previous entry and resetting its TTL.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) {
        let entry = CacheEntry::new(key, value, ttl_seconds);
        self.entries.write().await.insert(key.to_string(), entry);
    }

    // == Get ==
    /// Returns the value if present and not expired.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().await;
        let now = current_timestamp_ms();

        entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
    }

    // == Delete ==
    /// Removes an entry. Returns true if a live entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let now = current_timestamp_ms();
        self.entries
            .write()
            .await
            .remove(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Delete Pattern ==
    /// Removes every key matching the glob.
    ///
    /// The write lock is held across the whole scan, so no reader sees a
    /// partially cleared family and no concurrent `set` is lost mid-scan.
    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        let matcher = KeyPattern::compile(pattern);
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;

        let mut removed = 0;
        entries.retain(|key, entry| {
            if matcher.matches(key) {
                if !entry.is_expired_at(now) {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });
        removed
    }

    // == Keys ==
    /// Lists live keys matching the glob, sorted.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        let matcher = KeyPattern::compile(pattern);
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;

        let mut keys: Vec<String> = entries
            .values()
            .filter(|entry| !entry.is_expired_at(now) && matcher.matches(&entry.key))
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys
    }

    // == Flush ==
    /// Drops every entry. Returns how many were held.
    pub async fn flush(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    // == Purge Expired ==
    /// Physically removes expired entries. Returns the number removed.
    ///
    /// Expired keys are collected under the read lock, then removed in
    /// batches of `PURGE_BATCH_SIZE`, releasing the write lock between batches.
    pub async fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut removed = 0;
        for batch in expired.chunks(PURGE_BATCH_SIZE) {
            let mut entries = self.entries.write().await;
            for key in batch {
                // Re-set since the scan: fresh timestamp, keep it
                if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
                    entries.remove(key);
                    removed += 1;
                }
            }
            drop(entries);
            tokio::task::yield_now().await;
        }
        removed
    }

    // == Length ==
    /// Number of physically stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
