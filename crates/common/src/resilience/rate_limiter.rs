//! Sliding-window call limiter
//!
//! Keeps the timestamps of admitted calls and prunes the ones that fell out
//! of the window on every check. A call is admitted while fewer than
//! `max_calls` timestamps remain inside the window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::error::{ConfigError, ConfigResult};

/// Sliding-window rate limiter
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use relay_common::resilience::SlidingWindowLimiter;
///
/// let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60)).unwrap();
/// assert!(limiter.try_acquire());
/// assert!(limiter.try_acquire());
/// assert!(!limiter.try_acquire());
/// ```
#[derive(Debug)]
pub struct SlidingWindowLimiter<C: Clock = SystemClock> {
    max_calls: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
    clock: C,
}

impl SlidingWindowLimiter<SystemClock> {
    pub fn new(max_calls: usize, window: Duration) -> ConfigResult<Self> {
        Self::with_clock(max_calls, window, SystemClock)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    pub fn with_clock(max_calls: usize, window: Duration, clock: C) -> ConfigResult<Self> {
        if max_calls == 0 {
            return Err(ConfigError::invalid("max_calls must be greater than 0"));
        }
        if window.is_zero() {
            return Err(ConfigError::invalid("window must be greater than zero"));
        }

        let admitted = Mutex::new(VecDeque::with_capacity(max_calls.min(1024)));
        Ok(Self { max_calls, window, admitted, clock })
    }

    /// Admit one call if the window has room, recording it when admitted.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut admitted = self.admitted.lock();
        self.prune(&mut admitted, now);

        if admitted.len() < self.max_calls {
            admitted.push_back(now);
            true
        } else {
            debug!(
                max_calls = self.max_calls,
                window_secs = self.window.as_secs(),
                "Sliding window full, rejecting call"
            );
            false
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    fn prune(&self, admitted: &mut VecDeque<Instant>, now: Instant) {
        while admitted.front().is_some_and(|at| now.saturating_duration_since(*at) >= self.window) {
            admitted.pop_front();
        }
    }
}
