//! Response DTOs for the cache API
//!
//! Defines the structure of outgoing HTTP response bodies. The stats endpoint
//! serializes [`crate::cache::CacheStatsReport`] directly.

use serde::Serialize;

use crate::cache::{BackendMode, Tier};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored JSON value
    pub value: serde_json::Value,
    /// Tier that answered
    pub tier: Tier,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: serde_json::Value, tier: Tier) -> Self {
        Self {
            key: key.into(),
            value,
            tier,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// TTL applied, in seconds
    pub ttl: u64,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for pattern invalidation (DELETE /pattern/:pattern)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    /// Number of keys removed
    pub removed: u64,
}

/// Response body for key listing (GET /keys/:pattern)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub keys: Vec<String>,
}

/// Response body for POST /flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    pub message: String,
}

impl FlushResponse {
    pub fn flushed() -> Self {
        Self {
            message: "Cache flushed".to_string(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status, always "healthy": a fallback cache still serves
    pub status: String,
    /// Current backend routing mode
    pub mode: BackendMode,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(mode: BackendMode) -> Self {
        Self {
            status: "healthy".to_string(),
            mode,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
