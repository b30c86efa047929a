//! Integration tests for the resilient completion client.
//!
//! Breaker and cache time is driven by `MockClock`; backoff sleeps run on a
//! paused tokio clock so multi-second waits complete instantly.

mod support;

use std::sync::Arc;
use std::time::Duration;

use relay_common::{CircuitState, MockClock};
use relay_core::CompletionClient;
use relay_domain::{ChatMessage, ClassifiedError, CompletionOptions, RelayConfig};
use support::{enabled_config, ScriptedBackend};

fn client_with(
    config: RelayConfig,
    backend: &Arc<ScriptedBackend>,
    clock: &MockClock,
) -> CompletionClient<MockClock> {
    CompletionClient::with_clock(config, backend.clone(), clock.clone()).unwrap()
}

fn ask(text: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system("You are terse."), ChatMessage::user(text)]
}

/// Validates the cache idempotence scenario.
///
/// Assertions:
/// - Confirms the same logical request within TTL reaches the backend once.
/// - Confirms the second response equals the first.
#[tokio::test]
async fn identical_requests_hit_backend_once() {
    let backend = Arc::new(ScriptedBackend::new([Ok("first answer".to_string())]));
    let clock = MockClock::new();
    let client = client_with(enabled_config(), &backend, &clock);
    let options = CompletionOptions::default();

    let first = client.completion(&ask("capital of France?"), &options).await;
    let second = client.completion(&ask("capital of France?"), &options).await;

    assert_eq!(first.as_deref(), Some("first answer"));
    assert_eq!(second, first);
    assert_eq!(backend.calls(), 1);

    let health = client.health_status();
    let cache = health.cache.unwrap();
    assert_eq!((cache.size, cache.hits, cache.misses), (1, 1, 1));
}

/// Validates the cache bypass scenario.
///
/// Assertions:
/// - Confirms `use_cache = false` always reaches the backend.
#[tokio::test]
async fn cache_bypass_calls_backend_each_time() {
    let backend = Arc::new(ScriptedBackend::always(Ok("fresh".to_string())));
    let client = client_with(enabled_config(), &backend, &MockClock::new());
    let options = CompletionOptions::default().without_cache();

    client.completion(&ask("q"), &options).await;
    client.completion(&ask("q"), &options).await;

    assert_eq!(backend.calls(), 2);
}

/// Validates the disabled client scenario.
///
/// Assertions:
/// - Confirms a client without credentials never calls the backend.
/// - Confirms the breaker is untouched.
#[tokio::test]
async fn disabled_client_short_circuits() {
    let backend = Arc::new(ScriptedBackend::always(Ok("unused".to_string())));
    let mut config = enabled_config();
    config.completion.enabled = false;
    let client = client_with(config, &backend, &MockClock::new());

    assert_eq!(client.completion(&ask("q"), &CompletionOptions::default()).await, None);
    assert_eq!(backend.calls(), 0);

    let health = client.health_status();
    assert!(!health.enabled);
    assert!(!health.available);
    assert_eq!(health.breaker.consecutive_failures, 0);
}

/// Validates the no-retry classes scenario.
///
/// Assertions:
/// - Confirms authentication and client errors make exactly one call even
///   with `max_retries = 5`.
/// - Confirms each records a single breaker failure.
#[tokio::test]
async fn terminal_failures_are_not_retried() {
    for failure in [
        ClassifiedError::authentication("invalid api key"),
        ClassifiedError::client(400, "bad request"),
        ClassifiedError::unknown("unparseable body"),
    ] {
        let backend = Arc::new(ScriptedBackend::always(Err(failure.clone())));
        let mut config = enabled_config();
        config.retry.max_retries = 5;
        let client = client_with(config, &backend, &MockClock::new());

        let result = client.completion(&ask("q"), &CompletionOptions::default()).await;

        assert_eq!(result, None);
        assert_eq!(backend.calls(), 1, "{} must not be retried", failure.kind());
        let health = client.health_status();
        assert_eq!(health.breaker.consecutive_failures, 1);
        assert_eq!(health.last_failure.unwrap().kind, failure.kind());
    }
}

/// Validates the quick-mode bound scenario.
///
/// Assertions:
/// - Confirms quick mode makes at most one backend call for every class.
#[tokio::test(start_paused = true)]
async fn quick_mode_makes_single_attempt() {
    for failure in [
        ClassifiedError::rate_limit("429"),
        ClassifiedError::timeout("slow"),
        ClassifiedError::connection("refused"),
        ClassifiedError::server(502, "bad gateway"),
        ClassifiedError::authentication("401"),
    ] {
        let backend = Arc::new(ScriptedBackend::always(Err(failure)));
        let client = client_with(enabled_config(), &backend, &MockClock::new());

        assert_eq!(client.completion(&ask("q"), &CompletionOptions::quick()).await, None);
        assert_eq!(backend.calls(), 1);
    }
}

/// Validates the rate-limit backoff scenario.
///
/// Assertions:
/// - Confirms two rate-limited attempts wait 5s then 10s before the third
///   attempt succeeds.
/// - Confirms a successfully retried call leaves the breaker clean.
#[tokio::test(start_paused = true)]
async fn rate_limits_back_off_linearly_then_succeed() {
    let backend = Arc::new(ScriptedBackend::new([
        Err(ClassifiedError::rate_limit("slow down")),
        Err(ClassifiedError::rate_limit("slow down")),
        Ok("finally".to_string()),
    ]));
    let mut config = enabled_config();
    config.retry.rate_limit_wait_secs = 5;
    let client = client_with(config, &backend, &MockClock::new());

    let started = tokio::time::Instant::now();
    let result = client.completion(&ask("q"), &CompletionOptions::default()).await;

    assert_eq!(result.as_deref(), Some("finally"));
    assert_eq!(backend.calls(), 3);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(15) && waited < Duration::from_secs(16));

    let health = client.health_status();
    assert_eq!(health.breaker.state, CircuitState::Closed);
    assert_eq!(health.breaker.consecutive_failures, 0);
    assert!(health.last_failure.is_none());
}

/// Validates the exhausted retries scenario.
///
/// Assertions:
/// - Confirms `max_retries + 1` attempts are made.
/// - Confirms the breaker records exactly one failure for the operation.
#[tokio::test(start_paused = true)]
async fn exhausted_retries_record_one_failure() {
    let backend = Arc::new(ScriptedBackend::always(Err(ClassifiedError::server(503, "down"))));
    let client = client_with(enabled_config(), &backend, &MockClock::new());

    let started = tokio::time::Instant::now();
    let result = client.completion(&ask("q"), &CompletionOptions::default()).await;

    assert_eq!(result, None);
    assert_eq!(backend.calls(), 4);
    // 2s + 4s + 8s between the four attempts
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(14) && waited < Duration::from_secs(15));
    assert_eq!(client.health_status().breaker.consecutive_failures, 1);
}

/// Validates the per-call timeout scenario.
///
/// Assertions:
/// - Confirms a backend slower than the timeout is classified as a timeout.
#[tokio::test(start_paused = true)]
async fn slow_backend_times_out() {
    let backend =
        Arc::new(ScriptedBackend::always(Ok("late".to_string())).with_delay(Duration::from_secs(60)));
    let mut config = enabled_config();
    config.completion.timeout_secs = 2;
    let client = client_with(config, &backend, &MockClock::new());

    let result = client.completion(&ask("q"), &CompletionOptions::quick()).await;

    assert_eq!(result, None);
    assert_eq!(backend.last_request().unwrap().timeout, Duration::from_secs(2));
    assert_eq!(client.health_status().last_failure.unwrap().kind, "timeout");
}

/// Validates the breaker trip and recovery timeline.
///
/// Assertions:
/// - Confirms five timeouts at t=0 open the breaker.
/// - Confirms a call at t=150s returns `None` without a backend call.
/// - Confirms a call at t=301s is admitted and closes the breaker on success.
#[tokio::test]
async fn breaker_trips_and_recovers() {
    let mut script: Vec<Result<String, ClassifiedError>> =
        (0..5).map(|_| Err(ClassifiedError::timeout("no response"))).collect();
    script.push(Ok("recovered".to_string()));
    let backend = Arc::new(ScriptedBackend::new(script));
    let clock = MockClock::new();
    let client = client_with(enabled_config(), &backend, &clock);
    let quick = CompletionOptions::quick();

    for _ in 0..5 {
        assert_eq!(client.completion(&ask("q"), &quick).await, None);
    }
    assert_eq!(client.health_status().breaker.state, CircuitState::Open);
    assert!(!client.is_available());

    clock.advance_secs(150);
    assert_eq!(client.completion(&ask("q"), &quick).await, None);
    assert_eq!(backend.calls(), 5);

    clock.advance_secs(151);
    assert!(client.is_available());
    assert_eq!(client.completion(&ask("q"), &quick).await.as_deref(), Some("recovered"));
    assert_eq!(backend.calls(), 6);

    let breaker = client.health_status().breaker;
    assert_eq!(breaker.state, CircuitState::Closed);
    assert_eq!(breaker.consecutive_failures, 0);
}

/// Validates the failed half-open trial scenario.
///
/// Assertions:
/// - Confirms a failed trial re-opens the breaker with a fresh failure time.
#[tokio::test]
async fn failed_trial_reopens_breaker() {
    let backend = Arc::new(ScriptedBackend::always(Err(ClassifiedError::connection("refused"))));
    let clock = MockClock::new();
    let mut config = enabled_config();
    config.breaker.failure_threshold = 2;
    config.breaker.open_duration_secs = 60;
    let client = client_with(config, &backend, &clock);
    let quick = CompletionOptions::quick();

    client.completion(&ask("q"), &quick).await;
    client.completion(&ask("q"), &quick).await;
    let opened_at = client.health_status().breaker.last_failure_at.unwrap();

    clock.advance_secs(61);
    assert_eq!(client.completion(&ask("q"), &quick).await, None);
    assert_eq!(backend.calls(), 3);

    let breaker = client.health_status().breaker;
    assert_eq!(breaker.state, CircuitState::Open);
    assert!(breaker.last_failure_at.unwrap() > opened_at);

    clock.advance_secs(30);
    assert_eq!(client.completion(&ask("q"), &quick).await, None);
    assert_eq!(backend.calls(), 3);
}

/// Validates the concurrent half-open probe scenario.
///
/// Assertions:
/// - Confirms many callers arriving after the cooldown produce exactly one
///   backend call.
#[tokio::test(start_paused = true)]
async fn half_open_admits_single_trial_under_concurrency() {
    let backend = Arc::new(
        ScriptedBackend::new([
            Err(ClassifiedError::timeout("t")),
            Ok("trial ok".to_string()),
        ])
        .with_delay(Duration::from_millis(500)),
    );
    let clock = MockClock::new();
    let mut config = enabled_config();
    config.breaker.failure_threshold = 1;
    let client = client_with(config, &backend, &clock);
    let quick = CompletionOptions::quick().without_cache();

    client.completion(&ask("q"), &quick).await;
    assert_eq!(client.health_status().breaker.state, CircuitState::Open);

    clock.advance_secs(301);
    let messages = ask("q");
    let probes = (0..10).map(|_| client.completion(&messages, &quick));
    let results = futures::future::join_all(probes).await;

    assert_eq!(backend.calls(), 2);
    assert_eq!(results.iter().filter(|r| r.is_some()).count(), 1);
    assert_eq!(client.health_status().breaker.state, CircuitState::Closed);
}

/// Validates that a cache hit does not consume the half-open trial.
///
/// Assertions:
/// - Confirms a cached answer is served once the cooldown elapsed.
/// - Confirms the next uncached call still gets the trial.
#[tokio::test]
async fn cache_hit_releases_half_open_trial() {
    let backend = Arc::new(ScriptedBackend::new([
        Ok("cached answer".to_string()),
        Err(ClassifiedError::server(500, "boom")),
        Ok("trial answer".to_string()),
    ]));
    let clock = MockClock::new();
    let mut config = enabled_config();
    config.breaker.failure_threshold = 1;
    config.breaker.open_duration_secs = 10;
    let client = client_with(config, &backend, &clock);
    let quick = CompletionOptions::quick();

    client.completion(&ask("cached"), &quick).await;
    client.completion(&ask("other"), &quick).await;
    assert_eq!(client.health_status().breaker.state, CircuitState::Open);

    clock.advance_secs(11);
    assert_eq!(client.completion(&ask("cached"), &quick).await.as_deref(), Some("cached answer"));
    assert_eq!(backend.calls(), 2);

    assert_eq!(client.completion(&ask("new"), &quick).await.as_deref(), Some("trial answer"));
    assert_eq!(backend.calls(), 3);
}

/// Validates the empty response scenario.
///
/// Assertions:
/// - Confirms blank text is returned but not cached.
#[tokio::test]
async fn blank_responses_are_not_cached() {
    let backend =
        Arc::new(ScriptedBackend::new([Ok("   ".to_string()), Ok("real text".to_string())]));
    let client = client_with(enabled_config(), &backend, &MockClock::new());
    let options = CompletionOptions::default();

    assert_eq!(client.completion(&ask("q"), &options).await.as_deref(), Some("   "));
    assert_eq!(client.completion(&ask("q"), &options).await.as_deref(), Some("real text"));
    assert_eq!(backend.calls(), 2);
}

/// Validates the local throttle scenario.
///
/// Assertions:
/// - Confirms calls beyond the per-minute budget return `None` unsent.
/// - Confirms throttled calls do not count as breaker failures.
/// - Confirms the budget frees up after the window.
#[tokio::test]
async fn throttle_limits_calls_per_minute() {
    let backend = Arc::new(ScriptedBackend::always(Ok("ok".to_string())));
    let clock = MockClock::new();
    let mut config = enabled_config();
    config.throttle.max_calls_per_minute = Some(2);
    let client = client_with(config, &backend, &clock);
    let options = CompletionOptions::default().without_cache();

    assert!(client.completion(&ask("a"), &options).await.is_some());
    assert!(client.completion(&ask("b"), &options).await.is_some());
    assert_eq!(client.completion(&ask("c"), &options).await, None);
    assert_eq!(backend.calls(), 2);
    assert_eq!(client.health_status().breaker.consecutive_failures, 0);

    clock.advance_secs(60);
    assert!(client.completion(&ask("c"), &options).await.is_some());
}

/// Validates the operator controls scenario.
///
/// Assertions:
/// - Confirms `reset_breaker` closes an open breaker.
/// - Confirms `clear_cache` empties the cache and its counters.
/// - Confirms `sweep_expired_cache` removes entries past their TTL.
#[tokio::test]
async fn operator_controls() {
    let backend = Arc::new(ScriptedBackend::always(Ok("answer".to_string())));
    let clock = MockClock::new();
    let mut config = enabled_config();
    config.cache.ttl_secs = 10;
    let client = client_with(config, &backend, &clock);
    let options = CompletionOptions::default();

    client.completion(&ask("one"), &options).await;
    client.completion(&ask("two"), &options).await;
    assert_eq!(client.health_status().cache.unwrap().size, 2);

    clock.advance_secs(10);
    assert_eq!(client.sweep_expired_cache(), 0);
    clock.advance_secs(1);
    assert_eq!(client.sweep_expired_cache(), 2);
    assert_eq!(client.sweep_expired_cache(), 0);

    client.completion(&ask("three"), &options).await;
    client.clear_cache();
    let cache = client.health_status().cache.unwrap();
    assert_eq!((cache.size, cache.hits, cache.misses), (0, 0, 0));

    let failing = Arc::new(ScriptedBackend::always(Err(ClassifiedError::timeout("t"))));
    let mut config = enabled_config();
    config.breaker.failure_threshold = 1;
    let broken = client_with(config, &failing, &clock);
    broken.completion(&ask("q"), &CompletionOptions::quick()).await;
    assert!(!broken.is_available());

    broken.reset_breaker();
    assert!(broken.is_available());
    assert_eq!(broken.health_status().breaker.consecutive_failures, 0);
}

/// Validates request construction from options and configuration.
///
/// Assertions:
/// - Confirms defaults fill unset options and explicit values win.
#[tokio::test]
async fn request_carries_resolved_parameters() {
    let backend = Arc::new(ScriptedBackend::always(Ok("ok".to_string())));
    let mut config = enabled_config();
    config.completion.model = "llama-3.1-8b-instant".to_string();
    config.completion.max_tokens = 256;
    let client = client_with(config, &backend, &MockClock::new());

    let options = CompletionOptions::default().with_temperature(0.2).with_param("top_p", 0.5);
    client.completion(&ask("q"), &options).await;

    let request = backend.last_request().unwrap();
    assert_eq!(request.model, "llama-3.1-8b-instant");
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.params.max_tokens, 256);
    assert!((request.params.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(request.params.extra["top_p"], 0.5);
}

/// Validates configuration introspection.
///
/// Assertions:
/// - Confirms the credential never appears in the reported configuration.
#[test]
fn config_info_hides_api_key() {
    let backend = Arc::new(ScriptedBackend::default());
    let client = client_with(enabled_config(), &backend, &MockClock::new());

    let info = client.config_info();
    assert!(info.enabled);
    assert_eq!(info.max_retries, 3);
    assert_eq!(info.rate_limit_wait_secs, 60);

    let json = serde_json::to_string(&info).unwrap();
    assert!(!json.contains("test-api-key"));
}

#[tokio::test]
async fn completion_or_returns_fallback_on_failure() {
    let backend =
        Arc::new(ScriptedBackend::always(Err(ClassifiedError::authentication("bad key"))));
    let client = client_with(enabled_config(), &backend, &MockClock::new());

    let text = client
        .completion_or(&ask("q"), &CompletionOptions::default(), "Service unavailable")
        .await;
    assert_eq!(text, "Service unavailable");
}
