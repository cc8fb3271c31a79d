//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use chrono::Utc;

// == Cache Entry ==
/// A single cached payload with its write time and lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Namespaced key, e.g. `product:42`
    pub key: String,
    /// Opaque serialized payload
    pub value: Vec<u8>,
    /// Write timestamp (Unix milliseconds)
    pub cached_at: i64,
    /// Lifetime in seconds, 0 = no expiry
    pub ttl_seconds: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    ///
    /// # Arguments
    /// * `key` - The namespaced key
    /// * `value` - The serialized payload
    /// * `ttl_seconds` - Lifetime in seconds (0 disables expiry)
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl_seconds: u64) -> Self {
        Self {
            key: key.into(),
            value,
            cached_at: current_timestamp_ms(),
            ttl_seconds,
        }
    }

    /// Expiry timestamp in Unix milliseconds, `None` if the entry never expires.
    pub fn expires_at(&self) -> Option<i64> {
        if self.ttl_seconds == 0 {
            return None;
        }
        let ttl_ms = i64::try_from(self.ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        Some(self.cached_at.saturating_add(ttl_ms))
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against an explicit clock reading.
    ///
    /// Visible iff `now < cached_at + ttl`, so the entry is expired from the
    /// exact millisecond its TTL elapses.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at() {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.expires_at().map(|expires| {
            let remaining = expires - current_timestamp_ms();
            if remaining > 0 {
                (remaining as u64) / 1000
            } else {
                0
            }
        })
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn entry_at(cached_at: i64, ttl_seconds: u64) -> CacheEntry {
        CacheEntry {
            key: "product:1".to_string(),
            value: b"pen".to_vec(),
            cached_at,
            ttl_seconds,
        }
    }

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("product:42", b"{\"name\":\"pen\"}".to_vec(), 60);

        assert_eq!(entry.key, "product:42");
        assert_eq!(entry.value, b"{\"name\":\"pen\"}".to_vec());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let entry = entry_at(0, 0);
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired_at(i64::MAX));
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry_at(10_000, 2);

        assert!(!entry.is_expired_at(10_000));
        assert!(!entry.is_expired_at(11_999));
        assert!(entry.is_expired_at(12_000), "Entry should be expired at boundary");
        assert!(entry.is_expired_at(13_000));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("cart:7", b"x".to_vec(), 1);
        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Some(0));
    }

    #[test]
    fn test_ttl_remaining_seconds() {
        let entry = CacheEntry::new("session:abc", b"x".to_vec(), 10);

        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= 10);
        assert!(remaining >= 9);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = entry_at(current_timestamp_ms(), u64::MAX);
        assert!(!entry.is_expired());
    }
}
