//! Test double for the distributed tier.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::cache::{DistributedBackend, MemoryStore};
use crate::error::{BackendError, BackendResult};

/// Memory-backed stand-in for a remote server that can be switched off.
#[derive(Debug, Default)]
pub struct FlakyBackend {
    store: MemoryStore,
    available: AtomicBool,
    connect_calls: AtomicUsize,
    op_calls: AtomicUsize,
}

impl FlakyBackend {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            ..Self::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Data operations that reached the backend, failed ones included.
    pub fn op_calls(&self) -> usize {
        self.op_calls.load(Ordering::SeqCst)
    }

    pub async fn stored(&self, key: &str) -> Option<Vec<u8>> {
        self.store.get(key).await
    }

    fn check(&self) -> BackendResult<()> {
        self.op_calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::ConnectionRefused("backend switched off".into()))
        }
    }
}

#[async_trait]
impl DistributedBackend for FlakyBackend {
    async fn connect(&self) -> BackendResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::ConnectionRefused("backend switched off".into()))
        }
    }

    async fn ping(&self) -> BackendResult<()> {
        self.check()
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.store.get(key).await)
    }

    async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> BackendResult<()> {
        self.check()?;
        self.store.set(key, value.to_vec(), ttl_seconds).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        self.check()?;
        Ok(u64::from(self.store.delete(key).await))
    }

    async fn delete_pattern(&self, pattern: &str) -> BackendResult<u64> {
        self.check()?;
        Ok(self.store.delete_pattern(pattern).await as u64)
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        self.check()?;
        Ok(self.store.keys(pattern).await)
    }

    async fn flush(&self) -> BackendResult<u64> {
        self.check()?;
        Ok(self.store.flush().await as u64)
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}
