//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired memory-store entries.
//! Reads already hide expired entries; this only bounds memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryStore;

/// Spawns a background task that periodically purges expired entries.
///
/// Each pass scans under the read lock and removes expired entries in small
/// batches, so writers are never held off for a whole-map pass.
///
/// # Arguments
/// * `store` - The memory store shared with the cache facade
/// * `interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Cache::from_config(&config);
/// let sweeper = spawn_sweeper_task(cache.memory().clone(), 60);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper_task(store: Arc<MemoryStore>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweeper with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired().await;

            if removed > 0 {
                info!("Sweeper: removed {} expired entries", removed);
            } else {
                debug!("Sweeper: no expired entries found");
            }
        }
    })
}
