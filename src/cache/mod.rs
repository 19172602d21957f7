//! Cache Module
//!
//! Provides the concurrent in-memory store with jittered TTL expiration.

mod entry;
mod jitter;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use jitter::{default_jitter, JitterFn};
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::CacheStore;

// == Public Constants ==
/// Fraction of a TTL the default jitter may shave off (one tenth).
pub const JITTER_DIVISOR: u32 = 10;

/// Default one-in-N probability that serving a request triggers a sweep.
pub const DEFAULT_SWEEP_RATE: u32 = 1000;
