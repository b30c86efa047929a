//! Resilient completion client - core orchestration
//!
//! Composes the circuit breaker, retry policy, response cache and optional
//! call throttle around a [`CompletionBackend`]. Callers only ever see
//! `Option<String>`; every failure is logged and reflected in
//! [`CompletionClient::health_status`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_common::{
    CacheConfig, CircuitBreaker, Clock, ConfigError, FailureClass, RetryPolicy,
    SlidingWindowLimiter, SystemClock, TtlLruCache,
};
use relay_domain::{
    ChatMessage, ClassifiedError, CompletionOptions, RelayConfig, RelayError, Result,
};
use tracing::{debug, error, info, warn};

use super::fingerprint::RequestFingerprint;
use super::health::{CacheHealth, ConfigInfo, FailureRecord, HealthStatus};
use super::ports::{BackendRequest, CompletionBackend};

const THROTTLE_WINDOW: Duration = Duration::from_secs(60);

/// Completion client shared by every request handler in the process
///
/// Build it once at startup, wrap it in an `Arc` and hand clones of the
/// `Arc` to consumers.
pub struct CompletionClient<C: Clock + Clone = SystemClock> {
    config: RelayConfig,
    enabled: bool,
    backend: Arc<dyn CompletionBackend>,
    breaker: CircuitBreaker<C>,
    retry: RetryPolicy,
    cache: Option<TtlLruCache<RequestFingerprint, String, C>>,
    throttle: Option<SlidingWindowLimiter<C>>,
    last_failure: Mutex<Option<FailureRecord>>,
    clock: C,
}

impl CompletionClient<SystemClock> {
    /// Create a client using the system clock
    ///
    /// # Errors
    /// Returns `RelayError::Config` when the configuration is invalid.
    pub fn new(config: RelayConfig, backend: Arc<dyn CompletionBackend>) -> Result<Self> {
        Self::with_clock(config, backend, SystemClock)
    }
}

impl<C: Clock + Clone> CompletionClient<C> {
    /// Create a client with a custom clock (useful for testing)
    ///
    /// The clock drives the breaker cooldown, cache TTL and throttle window.
    /// Backoff sleeps always use the tokio timer.
    pub fn with_clock(
        config: RelayConfig,
        backend: Arc<dyn CompletionBackend>,
        clock: C,
    ) -> Result<Self> {
        config.validate()?;

        let breaker = CircuitBreaker::builder()
            .failure_threshold(config.breaker.failure_threshold)
            .open_duration(Duration::from_secs(config.breaker.open_duration_secs))
            .build_with_clock(clock.clone())
            .map_err(config_error)?;

        let retry = RetryPolicy::new(
            config.retry.max_retries,
            Duration::from_secs(config.retry.rate_limit_wait_secs),
            Duration::from_secs(config.retry.backoff_cap_secs),
        );

        let cache = if config.cache.enabled {
            let cache_config = CacheConfig::ttl_lru(
                Duration::from_secs(config.cache.ttl_secs),
                config.cache.max_size,
            );
            Some(TtlLruCache::with_clock(cache_config, clock.clone()).map_err(config_error)?)
        } else {
            None
        };

        let throttle = config
            .throttle
            .max_calls_per_minute
            .map(|max_calls| {
                SlidingWindowLimiter::with_clock(max_calls as usize, THROTTLE_WINDOW, clock.clone())
            })
            .transpose()
            .map_err(config_error)?;

        let enabled = config.is_enabled();
        info!(
            enabled,
            provider = %config.completion.provider,
            model = %config.completion.model,
            cache_enabled = config.cache.enabled,
            max_retries = config.retry.max_retries,
            "Completion client initialised"
        );

        Ok(Self {
            config,
            enabled,
            backend,
            breaker,
            retry,
            cache,
            throttle,
            last_failure: Mutex::new(None),
            clock,
        })
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Whether the feature flag is on and an API key is present
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Request a completion.
    ///
    /// Returns `None` when the client is disabled, the breaker is open, the
    /// local throttle is full, or the backend call ultimately fails.
    pub async fn completion(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Option<String> {
        if !self.enabled {
            debug!("Completion client disabled, skipping call");
            return None;
        }

        let Some(admission) = self.breaker.admit() else {
            debug!(state = %self.breaker.state(), "Circuit breaker rejecting completion call");
            return None;
        };

        let completion = &self.config.completion;
        let params = options.resolve(completion.temperature, completion.max_tokens);
        let cache = self.cache.as_ref().filter(|_| options.use_cache);
        let fingerprint =
            cache.map(|_| RequestFingerprint::compute(&completion.model, messages, &params));

        if let (Some(cache), Some(key)) = (cache, fingerprint.as_ref()) {
            if let Some(cached) = cache.get(key) {
                self.breaker.release_trial(admission);
                debug!(fingerprint = %key, "Serving completion from cache");
                return Some(cached);
            }
        }

        if let Some(throttle) = &self.throttle {
            if !throttle.try_acquire() {
                self.breaker.release_trial(admission);
                warn!(
                    max_calls_per_minute = throttle.max_calls(),
                    "Local call throttle full, skipping completion call"
                );
                return None;
            }
        }

        let request = BackendRequest {
            model: completion.model.clone(),
            messages: messages.to_vec(),
            params,
            timeout: completion.timeout(),
        };

        match self.call_with_retry(&request, options.quick_mode).await {
            Ok(text) => {
                self.breaker.record_success();
                if let (Some(cache), Some(key)) = (cache, fingerprint) {
                    if text.trim().is_empty() {
                        debug!("Backend returned empty text, not caching");
                    } else {
                        cache.insert(key, text.clone());
                    }
                }
                Some(text)
            }
            Err(failure) => {
                self.record_terminal_failure(&failure);
                None
            }
        }
    }

    /// Like [`completion`](Self::completion), substituting `fallback` for
    /// `None`.
    pub async fn completion_or(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        fallback: impl Into<String>,
    ) -> String {
        match self.completion(messages, options).await {
            Some(text) => text,
            None => fallback.into(),
        }
    }

    /// Whether a call made now could reach the backend.
    ///
    /// Never consumes the breaker's half-open trial.
    pub fn is_available(&self) -> bool {
        self.enabled && self.breaker.is_available()
    }

    /// Snapshot of enablement, breaker, cache counters and the last failure.
    ///
    /// Uses the same peek as [`is_available`](Self::is_available).
    pub fn health_status(&self) -> HealthStatus {
        HealthStatus {
            enabled: self.enabled,
            available: self.is_available(),
            breaker: self.breaker.snapshot(),
            cache: self.cache.as_ref().map(|cache| CacheHealth::from(&cache.stats())),
            last_failure: self.last_failure.lock().clone(),
        }
    }

    /// Effective configuration for diagnostics, without the API key
    pub fn config_info(&self) -> ConfigInfo {
        let completion = &self.config.completion;
        ConfigInfo {
            enabled: self.enabled,
            provider: completion.provider,
            model: completion.model.clone(),
            base_url: completion.effective_base_url().to_string(),
            temperature: completion.temperature,
            max_tokens: completion.max_tokens,
            timeout_secs: completion.timeout_secs,
            max_retries: self.retry.max_retries(),
            rate_limit_wait_secs: self.config.retry.rate_limit_wait_secs,
            cache_enabled: self.cache.is_some(),
            max_calls_per_minute: self.config.throttle.max_calls_per_minute,
            cache: self.cache.as_ref().map(|cache| cache.stats()),
        }
    }

    /// Operator override: close the breaker and zero its failure count.
    ///
    /// The last failure stays visible in [`health_status`](Self::health_status).
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// Empty the response cache and reset its counters
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            info!("Completion cache cleared");
        }
    }

    /// Drop expired cache entries, returning how many were removed.
    ///
    /// Safe to call on any schedule; lookups already ignore expired entries.
    pub fn sweep_expired_cache(&self) -> usize {
        let removed = self.cache.as_ref().map_or(0, |cache| cache.sweep_expired());
        if removed > 0 {
            debug!(removed, "Swept expired completion cache entries");
        }
        removed
    }

    /// Upper bound on how long one `completion` call may take, with or
    /// without quick mode.
    pub fn worst_case_latency(&self, quick_mode: bool) -> Duration {
        self.retry.worst_case_latency(self.config.completion.timeout(), quick_mode)
    }

    async fn call_with_retry(
        &self,
        request: &BackendRequest,
        quick_mode: bool,
    ) -> std::result::Result<String, ClassifiedError> {
        let attempts = self.retry.max_attempts(quick_mode);
        let mut attempt = 0;

        loop {
            let failure = match self.invoke_once(request).await {
                Ok(text) => return Ok(text),
                Err(failure) => failure,
            };

            let Some(class) = retry_class(&failure) else {
                return Err(failure);
            };
            if attempt + 1 >= attempts {
                return Err(failure);
            }

            let delay = self.retry.delay_for(attempt, class);
            warn!(
                attempt = attempt + 1,
                max_attempts = attempts,
                failure_class = %class,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "Completion attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn invoke_once(
        &self,
        request: &BackendRequest,
    ) -> std::result::Result<String, ClassifiedError> {
        match tokio::time::timeout(request.timeout, self.backend.invoke(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifiedError::timeout(format!(
                "no response within {}s",
                request.timeout.as_secs()
            ))),
        }
    }

    fn record_terminal_failure(&self, failure: &ClassifiedError) {
        self.breaker.record_failure();

        match failure {
            ClassifiedError::Authentication { .. } => {
                error!(error = %failure, "Completion backend rejected credentials");
            }
            _ => warn!(kind = failure.kind(), error = %failure, "Completion call failed"),
        }

        let at = DateTime::<Utc>::from(self.clock.system_time());
        *self.last_failure.lock() = Some(FailureRecord::new(failure, at));
    }
}

/// Rough token count for budgeting prompts, about four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Retry class of a failure, `None` for failures that are never retried.
fn retry_class(failure: &ClassifiedError) -> Option<FailureClass> {
    match failure {
        ClassifiedError::RateLimit { .. } => Some(FailureClass::RateLimit),
        ClassifiedError::Timeout { .. } => Some(FailureClass::Timeout),
        ClassifiedError::Connection { .. } => Some(FailureClass::Connection),
        ClassifiedError::ServerError { .. } => Some(FailureClass::ServerError),
        ClassifiedError::Authentication { .. }
        | ClassifiedError::ClientError { .. }
        | ClassifiedError::Unknown { .. } => None,
    }
}

fn config_error(err: ConfigError) -> RelayError {
    RelayError::Config(err.to_string())
}
