//! Failover Controller Module
//!
//! Decides which tier serves each operation. A single backend error trips the
//! controller into fallback; only a successful reconnection probe brings it back.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::DistributedBackend;
use crate::error::BackendError;

// == Backend Mode ==
/// Routing state of the distributed tier.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendMode {
    /// Operations go to the distributed backend
    Connected = 0,
    /// Operations go to the memory store
    Fallback = 1,
    /// A probe is in flight; operations still go to the memory store
    Reconnecting = 2,
}

impl BackendMode {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => BackendMode::Connected,
            2 => BackendMode::Reconnecting,
            _ => BackendMode::Fallback,
        }
    }
}

// == Backend State ==
/// Snapshot of the controller for stats and health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BackendState {
    pub mode: BackendMode,
    pub consecutive_failures: u32,
    pub last_attempt: Option<DateTime<Utc>>,
}

// == Failover Controller ==
pub struct FailoverController {
    backend: Option<Arc<dyn DistributedBackend>>,
    mode: AtomicU8,
    consecutive_failures: AtomicU32,
    /// Unix ms of the latest connect attempt, 0 = never
    last_attempt: AtomicI64,
    /// Bumped on every return to Connected from a non-connected mode
    generation: AtomicU64,
}

impl FailoverController {
    // == Constructors ==
    /// Creates a controller that will route to `backend` while it is healthy.
    pub fn new(backend: Arc<dyn DistributedBackend>) -> Self {
        Self {
            backend: Some(backend),
            mode: AtomicU8::new(BackendMode::Connected as u8),
            consecutive_failures: AtomicU32::new(0),
            last_attempt: AtomicI64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Creates a controller with no distributed tier; it stays in fallback.
    pub fn memory_only() -> Self {
        Self {
            backend: None,
            mode: AtomicU8::new(BackendMode::Fallback as u8),
            consecutive_failures: AtomicU32::new(0),
            last_attempt: AtomicI64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    // == Initialize ==
    /// Makes the startup connection attempt and settles the initial mode.
    pub async fn initialize(&self) -> BackendMode {
        let Some(backend) = self.backend.as_ref() else {
            info!("No distributed backend configured, serving from memory");
            return self.mode();
        };

        self.last_attempt.store(current_timestamp_ms(), Ordering::Relaxed);
        match backend.connect().await {
            Ok(()) => {
                self.record_success();
                self.enter_connected();
                info!("Cache backend '{}' connected", backend.name());
            }
            Err(err) => {
                warn!(
                    "Cache backend '{}' unavailable at startup ({}), using in-memory fallback",
                    backend.name(),
                    err
                );
                self.record_failure(&err);
            }
        }
        self.mode()
    }

    // == Mode ==
    /// Current routing mode. May be one transition stale.
    pub fn mode(&self) -> BackendMode {
        BackendMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.mode() == BackendMode::Connected
    }

    /// The distributed backend, only while operations should be routed to it.
    pub fn active_backend(&self) -> Option<&Arc<dyn DistributedBackend>> {
        if self.is_connected() {
            self.backend.as_ref()
        } else {
            None
        }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Number of reconnections so far. Memory-store contents written under an
    /// older generation belong to a previous outage.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn enter_connected(&self) {
        let previous = self.mode.load(Ordering::Acquire);
        if BackendMode::from_u8(previous) != BackendMode::Connected {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.mode.store(BackendMode::Connected as u8, Ordering::Release);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    // == Record Success ==
    /// Called after any successful distributed call.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    // == Record Failure ==
    /// Trips into fallback on the first error.
    pub fn record_failure(&self, err: &BackendError) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self.mode.swap(BackendMode::Fallback as u8, Ordering::AcqRel);

        if BackendMode::from_u8(previous) == BackendMode::Connected {
            warn!(
                "Cache backend error ({}), switching to in-memory fallback (failures={})",
                err, failures
            );
        } else {
            debug!("Cache backend error while not connected: {}", err);
        }
    }

    // == Probe ==
    /// Attempts to reconnect while in fallback.
    ///
    /// Fallback -> Reconnecting -> Connected on success, back to Fallback on
    /// failure. A no-op when already connected, when another probe is running,
    /// or when there is no backend.
    pub async fn probe(&self) -> BackendMode {
        let Some(backend) = self.backend.as_ref() else {
            return self.mode();
        };

        if self
            .mode
            .compare_exchange(
                BackendMode::Fallback as u8,
                BackendMode::Reconnecting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return self.mode();
        }

        self.last_attempt.store(current_timestamp_ms(), Ordering::Relaxed);
        debug!("Probing cache backend '{}'", backend.name());

        match backend.connect().await {
            Ok(()) => {
                self.record_success();
                self.enter_connected();
                info!("Cache backend '{}' reconnected", backend.name());
            }
            Err(err) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                self.mode.store(BackendMode::Fallback as u8, Ordering::Release);
                debug!(
                    "Reconnection to '{}' failed ({}), failures={}",
                    backend.name(),
                    err,
                    failures
                );
            }
        }
        self.mode()
    }

    // == State ==
    pub fn state(&self) -> BackendState {
        let last_attempt = match self.last_attempt.load(Ordering::Relaxed) {
            0 => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        };

        BackendState {
            mode: self.mode(),
            consecutive_failures: self.consecutive_failures(),
            last_attempt,
        }
    }
}

impl std::fmt::Debug for FailoverController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverController")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("mode", &self.mode())
            .field("consecutive_failures", &self.consecutive_failures())
            .finish()
    }
}
