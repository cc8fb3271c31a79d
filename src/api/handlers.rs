//! API Handlers
//!
//! HTTP request handlers for the cache's operational endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{Cache, CacheStatsReport};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, FlushResponse, GetResponse, HealthResponse, InvalidateResponse, KeysResponse,
    SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// The cache is built once at startup and handed to every consumer.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache facade
    pub cache: Arc<Cache>,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Cache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The cache is not connected yet; call [`Cache::initialize`] before serving.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Cache::from_config(config))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value under a key with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl
        .unwrap_or_else(|| state.cache.ttls().ttl_for_key(&req.key));
    state.cache.set_json(&req.key, &req.value, ttl).await?;

    Ok(Json(SetResponse::new(req.key, ttl)))
}

/// Handler for GET /get/:key
///
/// Retrieves a JSON value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let (value, tier) = state.cache.get_with_tier(&key).await;
    let bytes = value.ok_or_else(|| CacheError::NotFound(key.clone()))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;

    Ok(Json(GetResponse::new(key, value, tier)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.delete(&key).await {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for DELETE /pattern/:pattern
///
/// Removes every key matching a glob such as `product:*`.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    if pattern.is_empty() {
        return Err(CacheError::InvalidRequest("Pattern cannot be empty".to_string()));
    }

    let removed = state.cache.delete_pattern(&pattern).await;
    Ok(Json(InvalidateResponse { pattern, removed }))
}

/// Handler for GET /keys/:pattern
pub async fn keys_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Json<KeysResponse> {
    let keys = state.cache.keys(&pattern).await;
    Json(KeysResponse { pattern, keys })
}

/// Handler for POST /flush
pub async fn flush_handler(State(state): State<AppState>) -> Json<FlushResponse> {
    state.cache.flush_all().await;
    Json(FlushResponse::flushed())
}

/// Handler for GET /stats
///
/// Serializes the cache statistics as-is.
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStatsReport> {
    Json(state.cache.get_cache_stats().await)
}

/// Handler for GET /health
///
/// The cache is healthy in fallback too; the mode tells which tier is live.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.controller().mode()))
}
