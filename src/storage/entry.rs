//! Stored entries.

use std::time::{Duration, Instant};

/// Roughly 30 years; used when `now + ttl` would overflow `Instant`.
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// A key-value pair with an absolute expiry instant.
///
/// The key never changes once stored. The value and deadline are rewritten
/// in place when the same key is put again.
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    /// The key this entry is stored under
    pub key: K,
    /// The actual value stored
    pub value: V,
    /// When this entry stops being visible
    pub expires_at: Instant,
}

impl<K, V> Entry<K, V> {
    /// Creates an entry that expires `ttl` after `now`.
    pub fn new(key: K, value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            key,
            value,
            expires_at: deadline(now, ttl),
        }
    }

    /// Replaces the value and restarts the lifetime.
    pub fn refresh(&mut self, value: V, now: Instant, ttl: Duration) {
        self.value = value;
        self.expires_at = deadline(now, ttl);
    }

    /// Checks if this entry has expired as of `now`.
    ///
    /// An entry is live only while its deadline is strictly in the future.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Returns the remaining lifetime, zero once expired.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Computes `now + ttl`, saturating to a far-future instant on overflow.
#[inline]
pub(crate) fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Converts a signed millisecond ttl into a `Duration`.
///
/// Zero and negative values map to `Duration::ZERO`, which stores an entry
/// that is already expired.
#[inline]
pub fn ttl_from_millis(ttl_ms: i64) -> Duration {
    u64::try_from(ttl_ms)
        .map(Duration::from_millis)
        .unwrap_or(Duration::ZERO)
}
