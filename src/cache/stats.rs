//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and expirations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Atomic counters updated by the store on every operation.
///
/// Counters are relaxed; they feed observability, not control flow.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    sweeps: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates stats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Expirations ==
    /// Adds `count` lazily- or sweep-removed entries to the expiration counter.
    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    // == Record Sweep ==
    /// Increments the sweep counter.
    pub fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Captures a consistent-enough view of the counters for reporting.
    pub fn snapshot(&self, entries: usize) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            entries,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSnapshot {
    /// Number of fresh entries served.
    pub hits: u64,
    /// Number of lookups that found nothing usable.
    pub misses: u64,
    /// Number of entries removed because their TTL elapsed.
    pub expirations: u64,
    /// Number of full sweeps performed.
    pub sweeps: u64,
    /// Current number of entries in the store.
    pub entries: usize,
}

impl CacheStatsSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
