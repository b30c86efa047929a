//! Shared test helpers for `relay-core` integration tests.
//!
//! A scripted in-memory backend so that client tests can focus on breaker,
//! retry and cache behaviour instead of transport details.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{BackendRequest, CompletionBackend};
use relay_domain::{ClassifiedError, RelayConfig};

/// Backend replaying a fixed script of outcomes.
///
/// Once the script runs out every call succeeds with `"fallback reply"`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, ClassifiedError>>>,
    repeat: Option<Result<String, ClassifiedError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Result<String, ClassifiedError>>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), ..Self::default() }
    }

    /// Every call returns `outcome`
    pub fn always(outcome: Result<String, ClassifiedError>) -> Self {
        Self { repeat: Some(outcome), ..Self::default() }
    }

    /// Sleep on the tokio timer before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<BackendRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn invoke(&self, request: &BackendRequest) -> Result<String, ClassifiedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(outcome) = &self.repeat {
            return outcome.clone();
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok("fallback reply".to_string()))
    }
}

/// Enabled configuration with a test credential
pub fn enabled_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.completion.api_key = Some("test-api-key".to_string());
    config
}
