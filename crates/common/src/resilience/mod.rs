//! Resilience patterns for calls to unreliable dependencies
//!
//! This module provides **generic, reusable** building blocks:
//! - **Clock**: time abstraction so time-based behaviour is testable
//! - **Circuit Breaker**: stops calling a dependency after repeated failures
//!   and probes it again with a single trial after a cooldown
//! - **Retry Policy**: attempt counts and per-failure-class backoff delays
//! - **Rate Limiter**: sliding-window cap on local call rate
//!
//! None of these types perform the protected call themselves. The caller
//! composes them, which keeps sleeping and I/O outside of every lock.

pub mod circuit_breaker;
pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    Admission, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitState,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::SlidingWindowLimiter;
pub use retry::{BackoffStrategy, FailureClass, RetryPolicy};
