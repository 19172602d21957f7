//! Call Context Module
//!
//! Defines the context contract threaded through intercepted calls.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::watch;

// == Cancel Future Alias ==
/// Boxed future returned by [`CallContext::cancelled`].
pub type CancelFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

// == Call Context Trait ==
/// Per-call context passed through the interceptor to policies and handlers.
///
/// The interceptor treats the context as opaque except for one capability:
/// a waiter parked on a coalesced in-flight group polls
/// [`cancelled`](Self::cancelled) so it can stop waiting when its caller
/// gives up. Cancelling a waiter never disturbs the in-flight leader; its
/// execution and cache write still complete for the remaining waiters.
///
/// Timeouts are the caller's responsibility and should surface through the
/// same mechanism.
pub trait CallContext: Clone + Send + Sync + 'static {
    /// Resolves once the caller has abandoned this call.
    ///
    /// The default implementation never resolves, which is correct for
    /// contexts that cannot be cancelled.
    fn cancelled(&self) -> CancelFuture<'_> {
        Box::pin(std::future::pending())
    }
}

impl CallContext for () {}

// == Cancel Context ==
/// A minimal cancellable context for callers without a richer context type.
///
/// Dropping the [`CancelHandle`] also cancels the context.
#[derive(Debug, Clone)]
pub struct CancelContext {
    cancelled: watch::Receiver<bool>,
}

/// Owner side of a [`CancelContext`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelContext {
    /// Creates a context together with the handle that cancels it.
    pub fn new() -> (CancelHandle, CancelContext) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelContext { cancelled: rx })
    }
}

impl CancelHandle {
    /// Cancels every clone of the associated context.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CallContext for CancelContext {
    fn cancelled(&self) -> CancelFuture<'_> {
        let mut rx = self.cancelled.clone();
        Box::pin(async move {
            // A closed channel means the handle was dropped; treat as cancelled.
            let _ = rx.wait_for(|flag| *flag).await;
        })
    }
}
