//! Interceptor Module
//!
//! Orchestrates key policy, store, coalescer, cloner, and cleanup arbiter
//! around a wrapped unary handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::CacheStore;
use crate::clone::DeepClone;
use crate::config::CacheOptions;
use crate::context::CallContext;
use crate::error::{CallError, Result};
use crate::flight::{Flight, FlightRegistry};
use crate::key::CacheKey;

// == Unary Handler ==
/// A type-erased, reference-counted unary call handler.
///
/// The interceptor consumes and produces this exact shape, so wrapping is
/// transparent to the surrounding transport: `(context, request)` in,
/// `Result<response>` out.
pub type UnaryHandler<C, Req, Resp> = Arc<
    dyn Fn(C, Req) -> Pin<Box<dyn Future<Output = Result<Resp>> + Send>> + Send + Sync + 'static,
>;

/// Wraps an async closure into a [`UnaryHandler`].
pub fn unary_handler<C, Req, Resp, F, Fut>(handler: F) -> UnaryHandler<C, Req, Resp>
where
    F: Fn(C, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp>> + Send + 'static,
{
    Arc::new(move |ctx, req| Box::pin(handler(ctx, req)))
}

// == Cache Interceptor ==
/// Caching, request-coalescing interceptor for unary call handlers.
///
/// One interceptor owns one store and one in-flight registry; every handler
/// produced by [`wrap`](Self::wrap) on the same interceptor shares them, so
/// a response cached through one wrapped handler is served through all of
/// them.
///
/// Per request the interceptor runs one of five terminal paths:
/// - **bypass** — the key policy declined (or returned a zero TTL): the
///   handler is invoked directly and nothing else is consulted;
/// - **hit** — a fresh entry exists: an independent copy is served and the
///   handler is never invoked;
/// - **solo miss** — coalescing disabled: invoke, cache on success;
/// - **leader / follower miss** — coalescing enabled: the first caller for
///   the key invokes the handler and broadcasts the outcome, overlapping
///   callers await it.
///
/// After every non-bypass path the cleanup arbiter is consulted exactly once.
pub struct CacheInterceptor<C, Req, Resp> {
    store: Arc<CacheStore<Resp>>,
    flights: Arc<FlightRegistry<Resp>>,
    options: Arc<CacheOptions<C, Req, Resp>>,
}

impl<C, Req, Resp> Clone for CacheInterceptor<C, Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            flights: Arc::clone(&self.flights),
            options: Arc::clone(&self.options),
        }
    }
}

impl<C, Req, Resp> CacheInterceptor<C, Req, Resp>
where
    C: CallContext,
    Req: Send + 'static,
    Resp: DeepClone,
{
    // == Constructor ==
    /// Creates an interceptor from frozen options.
    pub fn new(options: CacheOptions<C, Req, Resp>) -> Self {
        let jitter = options.jitter.clone();
        Self {
            store: Arc::new(CacheStore::new(jitter)),
            flights: Arc::new(FlightRegistry::new()),
            options: Arc::new(options),
        }
    }

    /// The store shared by every handler wrapped by this interceptor.
    pub fn store(&self) -> &CacheStore<Resp> {
        &self.store
    }

    // == Wrap ==
    /// Wraps `inner`, returning a handler of the identical signature.
    pub fn wrap(&self, inner: UnaryHandler<C, Req, Resp>) -> UnaryHandler<C, Req, Resp> {
        let interceptor = self.clone();
        Arc::new(move |ctx, req| {
            let interceptor = interceptor.clone();
            let inner = Arc::clone(&inner);
            Box::pin(async move { interceptor.call(inner, ctx, req).await })
        })
    }

    // == Call ==
    /// Runs one intercepted call through the state machine.
    async fn call(self, inner: UnaryHandler<C, Req, Resp>, ctx: C, req: Req) -> Result<Resp> {
        let Some((key, ttl)) = (self.options.key_policy)(&ctx, &req) else {
            return inner(ctx, req).await;
        };
        if ttl.is_zero() {
            // Never-cache sentinel: same direct path as an undecided policy.
            return inner(ctx, req).await;
        }

        let result = if self.options.single_flight {
            self.coalesced(&inner, &ctx, req, key, ttl).await
        } else {
            self.solo(&inner, &ctx, req, key, ttl).await
        };

        self.conclude(&ctx, result)
    }

    // == Solo Path ==
    /// Hit-or-invoke without coalescing.
    ///
    /// Concurrent identical-key callers may each invoke the handler; the
    /// store's last-write-wins overwrite resolves the race — redundant work,
    /// never incorrect results.
    async fn solo(
        &self,
        inner: &UnaryHandler<C, Req, Resp>,
        ctx: &C,
        req: Req,
        key: CacheKey,
        ttl: Duration,
    ) -> Result<Resp> {
        if let Some(value) = self.store.get(&key) {
            debug!(%key, "cache hit");
            return Ok(value);
        }

        debug!(%key, "cache miss");
        let response = inner(ctx.clone(), req).await?;
        self.store.set(key, response.deep_clone(), ttl);
        Ok(response)
    }

    // == Coalesced Path ==
    /// Hit-or-invoke with at most one handler execution per key in flight.
    async fn coalesced(
        &self,
        inner: &UnaryHandler<C, Req, Resp>,
        ctx: &C,
        req: Req,
        key: CacheKey,
        ttl: Duration,
    ) -> Result<Resp> {
        loop {
            if let Some(value) = self.store.get(&key) {
                debug!(%key, "cache hit");
                return Ok(value);
            }

            match self.flights.join(key.clone()) {
                Flight::Leader(guard) => {
                    debug!(%key, "cache miss, leading coalesced execution");
                    return match inner(ctx.clone(), req).await {
                        Ok(response) => {
                            // Populate the store before releasing followers so
                            // late arrivals find the entry already cached.
                            self.store.set(key, response.deep_clone(), ttl);
                            guard.finish(Ok(response.deep_clone()));
                            Ok(response)
                        }
                        Err(err) => {
                            // A failed execution caches nothing; the error is
                            // the shared outcome.
                            guard.finish(Err(err.clone()));
                            Err(err)
                        }
                    };
                }
                Flight::Follower(mut slot) => {
                    debug!(%key, "awaiting coalesced execution");
                    let outcome = tokio::select! {
                        published = slot.wait_for(|slot| slot.is_some()) => match published {
                            Ok(slot) => match &*slot {
                                Some(Ok(value)) => Some(Ok(value.deep_clone())),
                                Some(Err(err)) => Some(Err(err.clone())),
                                None => None,
                            },
                            // Channel closed without a result.
                            Err(_) => None,
                        },
                        _ = ctx.cancelled() => return Err(CallError::Cancelled),
                    };

                    match outcome {
                        Some(result) => return result,
                        // Leader vanished without publishing; start over with
                        // a fresh lookup, possibly leading this time.
                        None => continue,
                    }
                }
            }
        }
    }

    // == Conclude ==
    /// Consults the cleanup arbiter once and passes the result through.
    fn conclude(&self, ctx: &C, result: Result<Resp>) -> Result<Resp> {
        if (self.options.cleanup_arbiter)(ctx, result.as_ref().ok()) {
            self.store.purge_expired();
        }
        result
    }
}
