//! Cache Facade Module
//!
//! The single entry point the rest of the application talks to. It holds no
//! storage of its own: each call goes to whichever tier the failover
//! controller designates, and backend failures are absorbed here by re-running
//! the operation against the memory store.
//!
//! Entries written to the memory store during one outage are discarded the
//! first time the memory store is used after a reconnection, so a later outage
//! never resurrects them. Invalidations are applied to the memory store as well
//! as the distributed tier.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{
    BackendMode, DistributedBackend, FailoverController, MemoryStore, RedisBackend,
    StatsAggregator, Tier,
};
use crate::config::Config;
use crate::error::Result;

// == Entity Kind ==
/// Entity families sharing the flat key space through a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Cart,
    Query,
    Session,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Product => "product:",
            EntityKind::Cart => "cart:",
            EntityKind::Query => "query:",
            EntityKind::Session => "session:",
        }
    }

    /// Namespaced key for `id`, e.g. `product:42`.
    pub fn key(&self, id: impl Display) -> String {
        format!("{}{}", self.prefix(), id)
    }

    /// Family of a namespaced key, if it carries a known prefix.
    pub fn from_key(key: &str) -> Option<Self> {
        [
            EntityKind::Product,
            EntityKind::Cart,
            EntityKind::Query,
            EntityKind::Session,
        ]
        .into_iter()
        .find(|kind| key.starts_with(kind.prefix()))
    }

    /// Glob matching the whole family, e.g. `product:*`.
    pub fn pattern(&self) -> String {
        format!("{}*", self.prefix())
    }
}

// == Entity TTLs ==
/// Default lifetimes per entity family, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTtls {
    pub product: u64,
    pub cart: u64,
    pub query: u64,
    pub session: u64,
}

impl EntityTtls {
    pub fn from_config(config: &Config) -> Self {
        Self {
            product: config.product_ttl,
            cart: config.cart_ttl,
            query: config.query_ttl,
            session: config.session_ttl,
        }
    }

    pub fn ttl_for(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Product => self.product,
            EntityKind::Cart => self.cart,
            EntityKind::Query => self.query,
            EntityKind::Session => self.session,
        }
    }

    /// Default TTL for a raw key; unprefixed keys get the query TTL.
    pub fn ttl_for_key(&self, key: &str) -> u64 {
        EntityKind::from_key(key)
            .map(|kind| self.ttl_for(kind))
            .unwrap_or(self.query)
    }
}

impl Default for EntityTtls {
    fn default() -> Self {
        Self {
            product: 3600,
            cart: 1800,
            query: 600,
            session: 7200,
        }
    }
}

// == Stats Report ==
/// What the statistics endpoint serializes.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// hits / (hits + misses), 0 before the first lookup
    pub hit_rate: f64,
    pub distributed_hits: u64,
    pub fallback_hits: u64,
    pub mode: BackendMode,
    /// Tier currently serving operations
    pub tier: Tier,
    pub consecutive_failures: u32,
    /// Entries physically held by the memory store
    pub memory_entries: usize,
}

// == Cache ==
pub struct Cache {
    memory: Arc<MemoryStore>,
    controller: Arc<FailoverController>,
    stats: StatsAggregator,
    ttls: EntityTtls,
    /// Controller generation the memory-store contents belong to
    memory_generation: AtomicU64,
    generation_lock: Mutex<()>,
}

impl Cache {
    // == Constructors ==
    pub fn new(
        memory: Arc<MemoryStore>,
        controller: Arc<FailoverController>,
        ttls: EntityTtls,
    ) -> Self {
        let generation = controller.generation();
        Self {
            memory,
            controller,
            stats: StatsAggregator::new(),
            ttls,
            memory_generation: AtomicU64::new(generation),
            generation_lock: Mutex::new(()),
        }
    }

    /// A cache with no distributed tier.
    pub fn memory_only(ttls: EntityTtls) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FailoverController::memory_only()),
            ttls,
        )
    }

    /// A cache routing to `backend` while it is healthy.
    pub fn with_backend(backend: Arc<dyn DistributedBackend>, ttls: EntityTtls) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FailoverController::new(backend)),
            ttls,
        )
    }

    /// Builds the cache from startup configuration. Does not connect yet.
    pub fn from_config(config: &Config) -> Self {
        let ttls = EntityTtls::from_config(config);

        if !config.redis_enabled {
            return Self::memory_only(ttls);
        }

        match RedisBackend::from_config(config) {
            Ok(backend) => Self::with_backend(Arc::new(backend), ttls),
            Err(err) => {
                warn!("Redis backend misconfigured ({}), serving from memory", err);
                Self::memory_only(ttls)
            }
        }
    }

    /// Runs the startup connection attempt.
    pub async fn initialize(&self) -> BackendMode {
        self.controller.initialize().await
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn controller(&self) -> &Arc<FailoverController> {
        &self.controller
    }

    pub fn ttls(&self) -> &EntityTtls {
        &self.ttls
    }

    /// Tier that will serve the next operation.
    pub fn active_tier(&self) -> Tier {
        if self.controller.active_backend().is_some() {
            Tier::Distributed
        } else {
            Tier::Fallback
        }
    }

    /// The memory store, emptied first if it still holds a previous outage.
    async fn fallback_store(&self) -> &MemoryStore {
        let current = self.controller.generation();
        if self.memory_generation.load(Ordering::Acquire) == current {
            return &self.memory;
        }

        let _guard = self.generation_lock.lock().await;
        if self.memory_generation.load(Ordering::Acquire) != current {
            let stale = self.memory.flush().await;
            self.memory_generation.store(current, Ordering::Release);
            if stale > 0 {
                debug!("Discarded {} in-memory entries from a previous outage", stale);
            }
        }
        &self.memory
    }

    // == Set ==
    /// Stores raw bytes under `key`. Returns the tier that accepted the write.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Tier {
        self.stats.record_set();

        if let Some(backend) = self.controller.active_backend() {
            match backend.set(key, &value, ttl_seconds).await {
                Ok(()) => {
                    self.controller.record_success();
                    return Tier::Distributed;
                }
                Err(err) => self.controller.record_failure(&err),
            }
        }

        self.fallback_store().await.set(key, value, ttl_seconds).await;
        Tier::Fallback
    }

    // == Get ==
    /// Looks up raw bytes. A miss is `None`, never an error.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.get_with_tier(key).await.0
    }

    /// Looks up raw bytes and reports which tier answered.
    pub async fn get_with_tier(&self, key: &str) -> (Option<Vec<u8>>, Tier) {
        if let Some(backend) = self.controller.active_backend() {
            match backend.get(key).await {
                Ok(value) => {
                    self.controller.record_success();
                    return self.record_lookup(value, Tier::Distributed);
                }
                Err(err) => self.controller.record_failure(&err),
            }
        }

        let value = self.fallback_store().await.get(key).await;
        self.record_lookup(value, Tier::Fallback)
    }

    fn record_lookup(&self, value: Option<Vec<u8>>, tier: Tier) -> (Option<Vec<u8>>, Tier) {
        match value {
            Some(_) => self.stats.record_hit(tier),
            None => self.stats.record_miss(),
        }
        (value, tier)
    }

    // == Delete ==
    /// Removes `key`. Returns true if something was removed.
    pub async fn delete(&self, key: &str) -> bool {
        if let Some(backend) = self.controller.active_backend() {
            match backend.delete(key).await {
                Ok(count) => {
                    self.controller.record_success();
                    self.memory.delete(key).await;
                    self.stats.record_delete(count);
                    return count > 0;
                }
                Err(err) => self.controller.record_failure(&err),
            }
        }

        let removed = self.fallback_store().await.delete(key).await;
        self.stats.record_delete(u64::from(removed));
        removed
    }

    // == Delete Pattern ==
    /// Removes every key matching the glob. Returns how many were removed.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        if let Some(backend) = self.controller.active_backend() {
            match backend.delete_pattern(pattern).await {
                Ok(count) => {
                    self.controller.record_success();
                    self.memory.delete_pattern(pattern).await;
                    self.stats.record_delete(count);
                    debug!("Invalidated {} keys matching '{}'", count, pattern);
                    return count;
                }
                Err(err) => self.controller.record_failure(&err),
            }
        }

        let count = self.fallback_store().await.delete_pattern(pattern).await as u64;
        self.stats.record_delete(count);
        debug!("Invalidated {} in-memory keys matching '{}'", count, pattern);
        count
    }

    // == Keys ==
    /// Lists live keys matching the glob on the active tier.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        if let Some(backend) = self.controller.active_backend() {
            match backend.keys(pattern).await {
                Ok(keys) => {
                    self.controller.record_success();
                    return keys;
                }
                Err(err) => self.controller.record_failure(&err),
            }
        }

        self.fallback_store().await.keys(pattern).await
    }

    // == Flush All ==
    /// Clears the active tier, and the memory store in every case.
    ///
    /// The deletes counter grows by what the serving tier removed: the
    /// backend's key count when connected, the memory-store count otherwise.
    pub async fn flush_all(&self) {
        let mut removed = None;
        if let Some(backend) = self.controller.active_backend() {
            match backend.flush().await {
                Ok(count) => {
                    self.controller.record_success();
                    removed = Some(count);
                }
                Err(err) => self.controller.record_failure(&err),
            }
        }

        let in_memory = self.fallback_store().await.flush().await as u64;
        self.stats.record_delete(removed.unwrap_or(in_memory));
    }

    // == Typed Access ==
    /// Serializes `value` as JSON and stores it.
    ///
    /// Encoding failure is the one error this facade returns.
    pub async fn set_json<T>(&self, key: &str, value: &T, ttl_seconds: u64) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes, ttl_seconds).await;
        Ok(())
    }

    /// Looks up and decodes a JSON payload.
    pub async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(key).await {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    // == Entity Helpers ==
    pub async fn get_entity<T>(&self, kind: EntityKind, id: impl Display) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.get_json(&kind.key(id)).await
    }

    /// Stores an entity; `ttl = None` uses the family default.
    pub async fn set_entity<T>(
        &self,
        kind: EntityKind,
        id: impl Display,
        value: &T,
        ttl: Option<u64>,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let ttl = ttl.unwrap_or_else(|| self.ttls.ttl_for(kind));
        self.set_json(&kind.key(id), value, ttl).await
    }

    pub async fn delete_entity(&self, kind: EntityKind, id: impl Display) -> bool {
        self.delete(&kind.key(id)).await
    }

    /// Drops the whole family, e.g. every `product:*` key.
    pub async fn invalidate(&self, kind: EntityKind) -> u64 {
        self.delete_pattern(&kind.pattern()).await
    }

    pub async fn get_product<T: DeserializeOwned>(&self, id: impl Display) -> Result<Option<T>> {
        self.get_entity(EntityKind::Product, id).await
    }

    pub async fn set_product<T: Serialize + ?Sized>(
        &self,
        id: impl Display,
        product: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        self.set_entity(EntityKind::Product, id, product, ttl).await
    }

    pub async fn delete_product(&self, id: impl Display) -> bool {
        self.delete_entity(EntityKind::Product, id).await
    }

    pub async fn get_cart<T: DeserializeOwned>(&self, id: impl Display) -> Result<Option<T>> {
        self.get_entity(EntityKind::Cart, id).await
    }

    pub async fn set_cart<T: Serialize + ?Sized>(
        &self,
        id: impl Display,
        cart: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        self.set_entity(EntityKind::Cart, id, cart, ttl).await
    }

    pub async fn delete_cart(&self, id: impl Display) -> bool {
        self.delete_entity(EntityKind::Cart, id).await
    }

    pub async fn get_session<T: DeserializeOwned>(&self, id: impl Display) -> Result<Option<T>> {
        self.get_entity(EntityKind::Session, id).await
    }

    pub async fn set_session<T: Serialize + ?Sized>(
        &self,
        id: impl Display,
        session: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        self.set_entity(EntityKind::Session, id, session, ttl).await
    }

    pub async fn delete_session(&self, id: impl Display) -> bool {
        self.delete_entity(EntityKind::Session, id).await
    }

    /// Cached result of `sql` run with `params`, if any.
    pub async fn get_query_result<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<Option<T>> {
        self.get_json(&query_key(sql, params)).await
    }

    pub async fn set_query_result<T: Serialize + ?Sized>(
        &self,
        sql: &str,
        params: &[serde_json::Value],
        rows: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttls.query);
        self.set_json(&query_key(sql, params), rows, ttl).await
    }

    // == Stats ==
    pub async fn get_cache_stats(&self) -> CacheStatsReport {
        let snapshot = self.stats.snapshot();
        let state = self.controller.state();

        CacheStatsReport {
            hits: snapshot.hits(),
            misses: snapshot.misses,
            sets: snapshot.sets,
            deletes: snapshot.deletes,
            hit_rate: snapshot.hit_rate(),
            distributed_hits: snapshot.distributed_hits,
            fallback_hits: snapshot.fallback_hits,
            mode: state.mode,
            tier: self.active_tier(),
            consecutive_failures: state.consecutive_failures,
            memory_entries: self.memory.len().await,
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("controller", &self.controller)
            .field("ttls", &self.ttls)
            .finish()
    }
}

// == Query Keys ==
/// Key for a query result: `query:` plus the SHA-256 of statement and params.
///
/// Stable across processes, so every node sharing the backend agrees on it.
pub fn query_key(sql: &str, params: &[serde_json::Value]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.trim().as_bytes());
    hasher.update([0u8]);
    hasher.update(serde_json::Value::Array(params.to_vec()).to_string().as_bytes());
    EntityKind::Query.key(hex::encode(hasher.finalize()))
}
