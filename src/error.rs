//! Error types for the caching interceptor
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Call Error Enum ==
/// Unified error type for intercepted calls.
///
/// Errors are shared between coalesced waiters, so every variant is `Clone`;
/// handler failures are wrapped in an `Arc` to make the opaque inner error
/// cheaply shareable.
#[derive(Error, Debug, Clone)]
pub enum CallError {
    /// The wrapped handler failed.
    ///
    /// Propagated verbatim to the caller and, when coalescing is enabled,
    /// to every waiter in the in-flight group. Never cached.
    #[error("handler error: {0}")]
    Handler(Arc<anyhow::Error>),

    /// The caller was cancelled while awaiting a coalesced result.
    ///
    /// Surfaced only to the cancelled waiter; the in-flight leader and the
    /// remaining waiters are unaffected.
    #[error("call cancelled while awaiting coalesced result")]
    Cancelled,
}

impl CallError {
    // == Constructor ==
    /// Wraps an arbitrary handler failure.
    pub fn handler(err: impl Into<anyhow::Error>) -> Self {
        Self::Handler(Arc::new(err.into()))
    }
}

// == Result Type Alias ==
/// Convenience Result type for intercepted calls.
pub type Result<T> = std::result::Result<T, CallError>;
