//! TTL Jitter Module
//!
//! Perturbs requested TTLs so entries warmed together do not expire together.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::cache::JITTER_DIVISOR;

// == Jitter Function Alias ==
/// Maps a requested TTL to the actual TTL used for the entry.
///
/// The result must satisfy `0 <= actual <= requested`. The function is never
/// invoked with a zero TTL; zero is the never-cache sentinel and is filtered
/// upstream by the key policy contract.
pub type JitterFn = Arc<dyn Fn(Duration) -> Duration + Send + Sync>;

// == Default Jitter ==
/// Shortens a TTL by a uniform random amount of up to one tenth.
///
/// Entries created in the same burst (a warmed cache, a thundering herd of
/// misses) would otherwise all expire in the same instant and stampede the
/// backend together; staggering the expirations spreads the refill load.
/// The TTL is never lengthened.
pub fn default_jitter(ttl: Duration) -> Duration {
    let spread = u64::try_from(ttl.as_nanos() / u128::from(JITTER_DIVISOR)).unwrap_or(u64::MAX);
    if spread == 0 {
        return ttl;
    }

    let cut = rand::thread_rng().gen_range(0..=spread);
    ttl.saturating_sub(Duration::from_nanos(cut))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_never_lengthens() {
        let ttl = Duration::from_secs(300);
        for _ in 0..1000 {
            assert!(default_jitter(ttl) <= ttl);
        }
    }

    #[test]
    fn test_jitter_shaves_at_most_one_tenth() {
        let ttl = Duration::from_secs(300);
        let floor = ttl - ttl / JITTER_DIVISOR;
        for _ in 0..1000 {
            assert!(default_jitter(ttl) >= floor);
        }
    }

    #[test]
    fn test_jitter_actually_varies() {
        let ttl = Duration::from_secs(300);
        let first = default_jitter(ttl);
        let varied = (0..100).any(|_| default_jitter(ttl) != first);
        assert!(varied, "1/10th of 300s leaves plenty of room to vary");
    }

    #[test]
    fn test_tiny_ttl_passes_through() {
        // A spread below one nanosecond rounds to zero: nothing to shave.
        let ttl = Duration::from_nanos(5);
        assert_eq!(default_jitter(ttl), ttl);
    }
}
