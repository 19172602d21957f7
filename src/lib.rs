//! callcache - a caching, request-coalescing interceptor for unary calls
//!
//! Wraps a unary handler `(context, request) -> Result<response>` with a
//! TTL cache, optional single-flight deduplication of concurrent identical
//! calls, and probabilistic timer-free cleanup of expired entries.

pub mod cache;
pub mod clone;
pub mod config;
pub mod context;
pub mod error;
mod flight;
pub mod interceptor;
pub mod key;

pub use cache::{default_jitter, CacheStatsSnapshot, CacheStore, JitterFn};
pub use clone::DeepClone;
pub use config::{CacheOptions, CleanupArbiter, KeyPolicy};
pub use context::{CallContext, CancelContext, CancelHandle};
pub use error::{CallError, Result};
pub use interceptor::{unary_handler, CacheInterceptor, UnaryHandler};
pub use key::CacheKey;
