//! Cache Store Module
//!
//! Concurrent mapping from cache key to entry with jittered TTL expiration.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::cache::{default_jitter, CacheEntry, CacheStats, CacheStatsSnapshot, JitterFn};
use crate::clone::DeepClone;
use crate::key::CacheKey;

// == Cache Store ==
/// Concurrent key → entry mapping with lazy expiry and on-demand sweeps.
///
/// The map is sharded, so operations on different keys never block each
/// other and no global lock is held across a lookup or insert; operations on
/// the same key are linearized by its shard. A lookup overlapping an insert
/// observes either the prior entry or the new one, never a torn entry.
pub struct CacheStore<V> {
    /// Key-value storage.
    entries: DashMap<CacheKey, CacheEntry<V>>,
    /// TTL perturbation applied on insert.
    jitter: JitterFn,
    /// Performance statistics.
    stats: CacheStats,
}

impl<V> std::fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<V: DeepClone> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store using the given jitter function.
    pub fn new(jitter: JitterFn) -> Self {
        Self {
            entries: DashMap::new(),
            jitter,
            stats: CacheStats::new(),
        }
    }

    // == Get ==
    /// Retrieves an independent copy of the value stored under `key`.
    ///
    /// Returns `None` if the key is absent or the entry has expired; an
    /// expired entry is removed as a side effect. This lazy removal is what
    /// makes expiry correct without any background task; the probabilistic
    /// sweep only reclaims space for keys nobody asks about anymore.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                self.stats.record_hit();
                return Some(entry.value.deep_clone());
            }
        }

        // Re-check the expiry under the shard lock so a concurrent overwrite
        // with a fresh entry is not deleted by mistake.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired())
            .is_some()
        {
            trace!(%key, "removed expired entry on lookup");
            self.stats.record_expirations(1);
        }

        self.stats.record_miss();
        None
    }

    // == Set ==
    /// Stores `value` under `key`, expiring after the jittered `ttl`.
    ///
    /// An existing entry for the key is overwritten atomically; the last
    /// writer wins. A zero TTL is the never-cache sentinel and stores
    /// nothing.
    pub fn set(&self, key: CacheKey, value: V, ttl: Duration) {
        if ttl.is_zero() {
            debug!(%key, "zero ttl, refusing to cache");
            return;
        }

        let actual_ttl = (self.jitter)(ttl);
        trace!(%key, ?actual_ttl, "stored entry");
        self.entries.insert(key, CacheEntry::new(value, actual_ttl));
    }

    // == Delete ==
    /// Removes the entry for `key` if present; no-op otherwise.
    pub fn delete(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    // == Purge Expired ==
    /// Scans the whole store and removes every expired entry.
    ///
    /// Holds each shard's lock only while scanning that shard, so lookups
    /// and inserts on other keys proceed concurrently. Returns the number of
    /// entries removed.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0usize;
        self.entries.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });

        self.stats.record_sweep();
        if removed > 0 {
            self.stats.record_expirations(removed as u64);
            debug!(removed, "swept expired entries");
        }
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the store's counters.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }

    // == Introspection ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an entry (fresh or expired) physically exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }
}

impl<V: DeepClone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(Arc::new(default_jitter))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    /// Store with identity jitter so TTLs in tests are exact.
    fn exact_store() -> CacheStore<String> {
        CacheStore::new(Arc::new(|ttl| ttl))
    }

    #[test]
    fn test_store_new() {
        let store = exact_store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_get() {
        let store = exact_store();

        store.set(CacheKey::text("key1"), "value1".to_string(), Duration::from_secs(300));
        let value = store.get(&CacheKey::text("key1"));

        assert_eq!(value.as_deref(), Some("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = exact_store();
        assert!(store.get(&CacheKey::text("nonexistent")).is_none());
    }

    #[test]
    fn test_store_delete() {
        let store = exact_store();

        store.set(CacheKey::text("key1"), "value1".to_string(), Duration::from_secs(300));
        store.delete(&CacheKey::text("key1"));

        assert!(store.is_empty());
        assert!(store.get(&CacheKey::text("key1")).is_none());
    }

    #[test]
    fn test_store_delete_nonexistent_is_noop() {
        let store = exact_store();
        store.delete(&CacheKey::text("nonexistent"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite_last_writer_wins() {
        let store = exact_store();
        let key = CacheKey::text("key1");

        store.set(key.clone(), "value1".to_string(), Duration::from_secs(300));
        store.set(key.clone(), "value2".to_string(), Duration::from_secs(300));

        assert_eq!(store.get(&key).as_deref(), Some("value2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_zero_ttl_never_caches() {
        let store = exact_store();
        store.set(CacheKey::text("key1"), "value1".to_string(), Duration::ZERO);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_ttl_expiration_and_lazy_removal() {
        let store = exact_store();
        let key = CacheKey::text("A");

        store.set(key.clone(), "v1".to_string(), Duration::from_millis(100));
        assert_eq!(store.get(&key).as_deref(), Some("v1"));

        sleep(Duration::from_millis(150));

        // The lookup itself must both miss and physically remove the entry.
        assert!(store.get(&key).is_none());
        assert!(!store.contains(&key));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_returned_value_is_independent() {
        let store = exact_store();
        let key = CacheKey::text("key1");
        store.set(key.clone(), "original".to_string(), Duration::from_secs(300));

        let mut served = store.get(&key).unwrap();
        served.push_str(" mutated");

        assert_eq!(store.get(&key).as_deref(), Some("original"));
    }

    #[test]
    fn test_store_purge_expired_keeps_live_entries() {
        let store = exact_store();

        store.set(CacheKey::text("dead"), "v".to_string(), Duration::from_millis(20));
        store.set(CacheKey::text("live"), "v".to_string(), Duration::from_secs(300));

        sleep(Duration::from_millis(40));

        let removed = store.purge_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(!store.contains(&CacheKey::text("dead")));
        assert!(store.contains(&CacheKey::text("live")));
    }

    #[test]
    fn test_store_purge_on_empty_store() {
        let store = exact_store();
        assert_eq!(store.purge_expired(), 0);
    }

    #[test]
    fn test_store_stats() {
        let store = exact_store();

        store.set(CacheKey::text("key1"), "value1".to_string(), Duration::from_secs(300));
        store.get(&CacheKey::text("key1")); // hit
        store.get(&CacheKey::text("nonexistent")); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_store_expired_lookup_counts_expiration_and_miss() {
        let store = exact_store();
        let key = CacheKey::text("key1");

        store.set(key.clone(), "v".to_string(), Duration::from_millis(10));
        sleep(Duration::from_millis(30));
        assert!(store.get(&key).is_none());

        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_default_store_applies_default_jitter() {
        let store: CacheStore<String> = CacheStore::default();
        store.set(CacheKey::text("k"), "v".to_string(), Duration::from_secs(300));

        // Jitter shortens by at most 10%, so the entry is comfortably fresh.
        assert_eq!(store.get(&CacheKey::text("k")).as_deref(), Some("v"));
    }
}
