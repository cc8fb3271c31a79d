//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.
//!
//! Two families exist: [`CacheError`] is what callers of the facade and the
//! HTTP surface can see, [`BackendError`] is the transport taxonomy of the
//! distributed backend and never leaves the failover path.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors surfaced to callers of the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key not found in cache (HTTP surface only, the facade returns `None`)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::Serialization(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Backend Error Enum ==
/// Failures talking to the distributed backend.
///
/// All variants are handled the same way by the failover controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<redis::RedisError> for BackendError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(err.to_string())
        } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            BackendError::ConnectionRefused(err.to_string())
        } else {
            BackendError::Protocol(err.to_string())
        }
    }
}

// == Result Type Aliases ==
/// Convenience Result type for the cache facade and API.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Result type used by distributed backend implementations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
