//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cached response with its absolute expiration.
///
/// Entries are created only from successful handler executions, replaced
/// wholesale on overwrite (last writer wins), and destroyed lazily by any
/// lookup or sweep that observes them expired.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored response, opaque to the cache.
    pub value: V,
    /// Absolute expiration timestamp.
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry expiring `ttl` from now.
    ///
    /// The TTL passed here is the post-jitter value; the store applies the
    /// jitter function before constructing the entry.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired when the current time is
    /// greater than or equal to the expiration time, so a zero remaining
    /// TTL means expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining TTL, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
