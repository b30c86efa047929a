//! Failure-class aware retry policy
//!
//! [`RetryPolicy`] is pure computation: how many attempts an operation gets
//! and how long to wait before the next one. It never sleeps and holds no
//! state, so callers are free to wait without holding any lock.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retryable failure classes, each with its own backoff curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The dependency asked us to slow down
    RateLimit,
    /// The call did not finish within its timeout
    Timeout,
    /// The dependency could not be reached
    Connection,
    /// The dependency failed on its side (5xx)
    ServerError,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection"),
            Self::ServerError => write!(f, "server_error"),
        }
    }
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Linear backoff: initial_delay + (attempt * increment)
    Linear { initial_delay: Duration, increment: Duration },
    /// Exponential backoff: initial_delay * base^attempt, capped at max_delay
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Calculate the delay after the given zero-based attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Linear { initial_delay, increment } => {
                initial_delay.saturating_add(increment.saturating_mul(attempt))
            }
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                #[allow(clippy::cast_precision_loss)]
                let delay_ms = initial_delay.as_millis() as f64 * base.powi(exponent);
                #[allow(clippy::cast_precision_loss)]
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Attempt counts and inter-attempt delays for a remote call
///
/// - Rate limits back off linearly: `base_wait * (attempt + 1)`.
/// - Timeouts, connection and server errors back off exponentially:
///   `min(2^(attempt + 1) s, cap)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    rate_limit_backoff: BackoffStrategy,
    transient_backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    /// Build the standard policy.
    ///
    /// * `max_retries` - retries after the first attempt
    /// * `rate_limit_base_wait` - linear step for rate-limit backoff
    /// * `backoff_cap` - ceiling for exponential backoff
    pub fn new(max_retries: u32, rate_limit_base_wait: Duration, backoff_cap: Duration) -> Self {
        Self {
            max_retries,
            rate_limit_backoff: BackoffStrategy::Linear {
                initial_delay: rate_limit_base_wait,
                increment: rate_limit_base_wait,
            },
            transient_backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_secs(2),
                base: 2.0,
                max_delay: backoff_cap,
            },
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts (first try included) one operation may make.
    ///
    /// Quick mode always gets exactly one attempt.
    pub fn max_attempts(&self, quick_mode: bool) -> u32 {
        if quick_mode {
            1
        } else {
            self.max_retries.saturating_add(1)
        }
    }

    /// Delay to wait after `attempt` (zero-based) failed with `class`.
    pub fn delay_for(&self, attempt: u32, class: FailureClass) -> Duration {
        match class {
            FailureClass::RateLimit => self.rate_limit_backoff.calculate_delay(attempt),
            FailureClass::Timeout | FailureClass::Connection | FailureClass::ServerError => {
                self.transient_backoff.calculate_delay(attempt)
            }
        }
    }

    /// Upper bound on the wall time of one operation.
    ///
    /// Every attempt may run for `call_timeout`, and every attempt but the
    /// last may be followed by the longest delay any class can produce.
    pub fn worst_case_latency(&self, call_timeout: Duration, quick_mode: bool) -> Duration {
        let attempts = self.max_attempts(quick_mode);
        (0..attempts).fold(Duration::ZERO, |total, attempt| {
            let wait = if attempt + 1 < attempts {
                self.rate_limit_backoff
                    .calculate_delay(attempt)
                    .max(self.transient_backoff.calculate_delay(attempt))
            } else {
                Duration::ZERO
            };
            total.saturating_add(call_timeout).saturating_add(wait)
        })
    }
}
