//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is live.
//!
//! # Tasks
//! - Sweeper: Removes expired entries from the memory store
//! - Reconnect: Probes the distributed backend while in fallback

mod reconnect;
mod sweeper;

pub use reconnect::spawn_reconnect_task;
pub use sweeper::spawn_sweeper_task;
