//! API Module
//!
//! HTTP handlers and routing for the cache's operational endpoints.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `DELETE /pattern/:pattern` - Invalidate a key family
//! - `GET /keys/:pattern` - List matching keys
//! - `POST /flush` - Clear the cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
