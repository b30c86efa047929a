//! Three-state circuit breaker gating calls to an unreliable dependency
//!
//! The breaker does not wrap the protected call. Callers ask
//! [`CircuitBreaker::admit`] (or [`CircuitBreaker::can_attempt`]) before doing
//! work and report the outcome
//! of the whole logical operation with [`CircuitBreaker::record_success`] or
//! [`CircuitBreaker::record_failure`]. This lets a caller run several retries
//! between the check and the report while the breaker counts one failure.
//!
//! State is kept behind a single mutex so a transition is never observed
//! half-applied by a concurrent caller.

use std::fmt;
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use crate::error::{ConfigError, ConfigResult};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, one trial request is probing for recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Proof that [`CircuitBreaker::admit`] let a caller through
///
/// Only the holder of the current `Trial` can hand it back with
/// [`CircuitBreaker::release_trial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Admission {
    /// Admitted while the circuit was closed
    Closed,
    /// Owner of the half-open trial with this generation number
    Trial(u64),
}

impl Admission {
    pub const fn is_trial(self) -> bool {
        matches!(self, Self::Trial(_))
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive recorded failures before the circuit opens
    pub failure_threshold: u32,
    /// Time since the last failure before an open circuit grants a trial
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, open_duration: Duration::from_secs(300) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be greater than 0"));
        }

        if self.open_duration.is_zero() {
            return Err(ConfigError::invalid("open_duration must be greater than zero"));
        }

        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn open_duration(mut self, duration: Duration) -> Self {
        self.config.open_duration = duration;
        self
    }

    /// Build a breaker on a custom clock (useful for testing)
    pub fn build_with_clock<C: Clock>(self, clock: C) -> ConfigResult<CircuitBreaker<C>> {
        CircuitBreaker::with_clock(self.config, clock)
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time view of the breaker for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    last_failure_wall: Option<SystemTime>,
    /// Set while a half-open trial is outstanding.
    trial_started_at: Option<Instant>,
    /// Bumped each time a trial is granted; survives `reset`.
    trial_generation: u64,
}

impl BreakerState {
    const fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            last_failure_wall: None,
            trial_started_at: None,
            trial_generation: 0,
        }
    }

    fn grant_trial(&mut self, now: Instant) -> Admission {
        self.trial_generation = self.trial_generation.wrapping_add(1);
        self.trial_started_at = Some(now);
        Admission::Trial(self.trial_generation)
    }
}

/// Consecutive-failure circuit breaker
///
/// - `Closed`: every attempt is allowed.
/// - `Open`: attempts are rejected until `open_duration` has passed since the
///   last recorded failure; the first caller after that moves the breaker to
///   `HalfOpen` and owns the single trial.
/// - `HalfOpen`: further callers are rejected while the trial is outstanding.
///   A success closes the circuit, a failure re-opens it with a fresh
///   `last_failure_at`. A trial that is never reported is treated as
///   abandoned once `open_duration` passes, and a new trial is granted.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    clock: C,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("consecutive_failures", &inner.consecutive_failures)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker on the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config, inner: Mutex::new(BreakerState::closed()), clock })
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Ask whether a new attempt may proceed.
    ///
    /// May transition `Open -> HalfOpen`. An [`Admission::Trial`] hands the
    /// caller the single trial, which it must settle with `record_success`,
    /// `record_failure` or `release_trial`.
    pub fn admit(&self) -> Option<Admission> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => Some(Admission::Closed),
            CircuitState::Open => {
                if self.cooldown_elapsed(&inner, now) {
                    inner.state = CircuitState::HalfOpen;
                    info!(
                        consecutive_failures = inner.consecutive_failures,
                        "Circuit breaker half-open, granting trial call"
                    );
                    Some(inner.grant_trial(now))
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                if self.trial_outstanding(&inner, now) {
                    debug!("Circuit breaker half-open trial in flight, rejecting call");
                    None
                } else {
                    Some(inner.grant_trial(now))
                }
            }
        }
    }

    /// [`admit`](Self::admit) for callers that only report outcomes.
    pub fn can_attempt(&self) -> bool {
        self.admit().is_some()
    }

    /// Side-effect free version of [`can_attempt`](Self::can_attempt).
    ///
    /// Health probes use this so that looking at the breaker never consumes
    /// the half-open trial.
    pub fn is_available(&self) -> bool {
        let now = self.clock.now();
        let inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => self.cooldown_elapsed(&inner, now),
            CircuitState::HalfOpen => !self.trial_outstanding(&inner, now),
        }
    }

    /// Give back a half-open trial without reporting an outcome.
    ///
    /// No-op unless `admission` is the trial currently outstanding, so a
    /// caller admitted earlier can never free somebody else's trial.
    pub fn release_trial(&self, admission: Admission) {
        let Admission::Trial(generation) = admission else {
            return;
        };

        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen
            && inner.trial_started_at.is_some()
            && inner.trial_generation == generation
        {
            inner.trial_started_at = None;
            debug!(generation, "Circuit breaker half-open trial released unused");
        }
    }

    /// Record a successful operation
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        let previous = inner.state;

        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.trial_started_at = None;

        if previous != CircuitState::Closed {
            info!(previous = %previous, "Circuit breaker closed after successful call");
        }
    }

    /// Record a failed operation
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let wall = self.clock.system_time();
        let mut inner = self.inner.lock();

        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(now);
        inner.last_failure_wall = Some(wall);
        inner.trial_started_at = None;

        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        consecutive_failures = inner.consecutive_failures,
                        open_for_secs = self.config.open_duration.as_secs(),
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                warn!(
                    consecutive_failures = inner.consecutive_failures,
                    "Circuit breaker re-opened after failed trial call"
                );
            }
            CircuitState::Open => {}
        }
    }

    /// Force the breaker closed and forget all failures
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let generation = inner.trial_generation;
        *inner = BreakerState::closed();
        inner.trial_generation = generation;
        drop(inner);
        info!("Circuit breaker manually reset to closed state");
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_wall.map(DateTime::<Utc>::from),
        }
    }

    fn cooldown_elapsed(&self, inner: &BreakerState, now: Instant) -> bool {
        inner
            .last_failure_at
            .map_or(true, |at| now.saturating_duration_since(at) >= self.config.open_duration)
    }

    fn trial_outstanding(&self, inner: &BreakerState, now: Instant) -> bool {
        inner
            .trial_started_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.config.open_duration)
    }
}
