//! Distributed Backend Trait
//!
//! The seam between the failover controller and the networked cache server.
//! Implementations must absorb every transport problem into a
//! [`BackendError`]; nothing here may panic on network failure.

use async_trait::async_trait;

use crate::error::BackendResult;

/// Operations the distributed tier must support.
///
/// Mirrors the memory store contract, but every call may fail.
#[async_trait]
pub trait DistributedBackend: Send + Sync {
    /// Establishes (or re-establishes) the connection.
    async fn connect(&self) -> BackendResult<()>;

    /// Lightweight liveness check used by reconnection probes.
    async fn ping(&self) -> BackendResult<()>;

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Stores a value; `ttl_seconds = 0` stores without expiry.
    async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> BackendResult<()>;

    /// Returns the number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> BackendResult<u64>;

    /// Removes every key matching the glob, returning how many were removed.
    async fn delete_pattern(&self, pattern: &str) -> BackendResult<u64>;

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>>;

    /// Drops every key, returning how many were held.
    async fn flush(&self) -> BackendResult<u64>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
