//! Modular building blocks shared across Relay crates.
//!
//! Nothing in this crate knows what a completion request is. It provides the
//! generic pieces the completion client is assembled from: a clock
//! abstraction, a circuit breaker, a failure-class aware retry policy, a
//! sliding-window call limiter, and a bounded TTL + LRU cache.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: configuration errors and plain data types
//! - `runtime`: shared mutable state (resilience, cache)
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use cache::{CacheConfig, CacheConfigBuilder, CacheStats, TtlLruCache};
#[cfg(feature = "foundation")]
pub use error::{ConfigError, ConfigResult};
#[cfg(feature = "runtime")]
pub use resilience::{
    Admission, BackoffStrategy, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitState, Clock, FailureClass, MockClock, RetryPolicy,
    SlidingWindowLimiter, SystemClock,
};
