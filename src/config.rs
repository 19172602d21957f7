//! Configuration Module
//!
//! Immutable interceptor options assembled once at construction time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::cache::{default_jitter, JitterFn, DEFAULT_SWEEP_RATE};
use crate::key::CacheKey;

// == Policy Function Aliases ==
/// Derives a cache key and TTL from a request.
///
/// `None` means "do not cache this call": the handler is invoked directly and
/// every other component is bypassed. A `Some` with a zero TTL is treated the
/// same way. The policy must be idempotent per logically-identical request:
/// two calls meant to be the same cacheable unit must yield equal keys.
pub type KeyPolicy<C, Req> = Arc<dyn Fn(&C, &Req) -> Option<(CacheKey, Duration)> + Send + Sync>;

/// Decides, once per served request, whether to sweep the store.
///
/// Receives the context and the response when the call produced one
/// (`None` on handler failure). Returning true triggers a full expired-entry
/// sweep on the serving task, which is how cleanup cost stays amortized over
/// traffic without a background timer.
pub type CleanupArbiter<C, Resp> = Arc<dyn Fn(&C, Option<&Resp>) -> bool + Send + Sync>;

// == Cache Options ==
/// Interceptor configuration, frozen at construction.
///
/// Built from `Default` plus `with_*` calls; nothing mutates it afterwards,
/// so every handler wrapped by the same interceptor observes one consistent
/// configuration.
pub struct CacheOptions<C, Req, Resp> {
    /// Coalesce concurrent identical-key calls into one handler execution.
    pub(crate) single_flight: bool,
    /// Cacheability policy; the default bypasses everything.
    pub(crate) key_policy: KeyPolicy<C, Req>,
    /// Sweep trigger; the default fires once per ~1000 served requests.
    pub(crate) cleanup_arbiter: CleanupArbiter<C, Resp>,
    /// TTL perturbation; the default shaves up to 10%.
    pub(crate) jitter: JitterFn,
}

impl<C, Req, Resp> Default for CacheOptions<C, Req, Resp> {
    fn default() -> Self {
        Self {
            single_flight: false,
            key_policy: Arc::new(|_, _| None),
            cleanup_arbiter: Arc::new(|_, _| rand::thread_rng().gen_ratio(1, DEFAULT_SWEEP_RATE)),
            jitter: Arc::new(default_jitter),
        }
    }
}

impl<C, Req, Resp> CacheOptions<C, Req, Resp> {
    // == Constructor ==
    /// Creates the default options: bypass-everything policy, coalescing off.
    pub fn new() -> Self {
        Self::default()
    }

    // == Builders ==
    /// Enables or disables request coalescing.
    #[must_use]
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Sets the key policy deciding cacheability per call.
    #[must_use]
    pub fn with_key_policy(
        mut self,
        policy: impl Fn(&C, &Req) -> Option<(CacheKey, Duration)> + Send + Sync + 'static,
    ) -> Self {
        self.key_policy = Arc::new(policy);
        self
    }

    /// Sets the cleanup arbiter consulted after each served request.
    #[must_use]
    pub fn with_cleanup_arbiter(
        mut self,
        arbiter: impl Fn(&C, Option<&Resp>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.cleanup_arbiter = Arc::new(arbiter);
        self
    }

    /// Sets the TTL jitter function.
    #[must_use]
    pub fn with_jitter(
        mut self,
        jitter: impl Fn(Duration) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }
}

impl<C, Req, Resp> fmt::Debug for CacheOptions<C, Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("single_flight", &self.single_flight)
            .finish_non_exhaustive()
    }
}
