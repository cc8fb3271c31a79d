//! Reconnection Task
//!
//! Background task that probes the distributed backend while the cache is in
//! fallback, restoring the distributed tier once it answers again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{BackendMode, FailoverController};

/// Spawns the reconnection probe loop.
///
/// Ticks every `interval` and calls [`FailoverController::probe`] when the
/// controller is not connected. The probe itself is bounded by the backend's
/// connect timeout, so a dead server never stalls the loop for long.
pub fn spawn_reconnect_task(
    controller: Arc<FailoverController>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !controller.has_backend() {
            debug!("No distributed backend, reconnect task idle");
            return;
        }

        info!(
            "Starting reconnect task with interval of {}ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            if controller.mode() == BackendMode::Connected {
                continue;
            }

            let mode = controller.probe().await;
            debug!("Reconnect probe finished in mode {:?}", mode);
        }
    })
}
