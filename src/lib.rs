//! Shop Cache - tiered caching for the storefront backend
//!
//! Reads for products, carts, sessions and query results go through a single
//! [`Cache`] facade backed by Redis, with transparent failover to an
//! in-process TTL store whenever Redis is unreachable.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::Cache;
pub use config::Config;
pub use tasks::{spawn_reconnect_task, spawn_sweeper_task};
