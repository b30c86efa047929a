//! Configuration management
//!
//! [`RelayConfig`] is built once at process start and never changes
//! afterwards. Every section has defaults, so a partial file or environment
//! only needs to name what it overrides.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{RelayError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub completion: CompletionConfig,
    pub retry: RetrySettings,
    pub cache: CacheSettings,
    pub breaker: BreakerSettings,
    pub throttle: ThrottleSettings,
}

impl RelayConfig {
    /// Reject values the client cannot run with
    ///
    /// # Errors
    /// Returns `RelayError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.completion.model.trim().is_empty() {
            return Err(RelayError::Config("completion.model must not be empty".into()));
        }
        if self.completion.timeout_secs == 0 {
            return Err(RelayError::Config("completion.timeout_secs must be greater than 0".into()));
        }
        if self.cache.max_size == 0 {
            return Err(RelayError::Config("cache.max_size must be greater than 0".into()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(RelayError::Config("cache.ttl_secs must be greater than 0".into()));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(RelayError::Config("breaker.failure_threshold must be greater than 0".into()));
        }
        if self.breaker.open_duration_secs == 0 {
            return Err(RelayError::Config(
                "breaker.open_duration_secs must be greater than 0".into(),
            ));
        }
        if self.throttle.max_calls_per_minute == Some(0) {
            return Err(RelayError::Config(
                "throttle.max_calls_per_minute must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// Both the feature flag and a credential are required to call out
    pub fn is_enabled(&self) -> bool {
        self.completion.enabled
            && self.completion.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

/// Completion backend provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Groq,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Groq => "llama-3.1-8b-instant",
        }
    }

    /// Parse a provider name case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "groq" => Some(Self::Groq),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Groq => write!(f, "groq"),
        }
    }
}

/// Backend identity and default generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub enabled: bool,
    pub provider: Provider,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: Provider::OpenAi,
            model: Provider::OpenAi.default_model().to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 30,
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured base URL, or the provider default
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Linear step between rate-limited attempts
    pub rate_limit_wait_secs: u64,
    /// Ceiling for exponential backoff
    pub backoff_cap_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_retries: 3, rate_limit_wait_secs: 60, backoff_cap_secs: 30 }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_size: usize,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true, max_size: 1000, ttl_secs: 3600 }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub open_duration_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self { failure_threshold: 5, open_duration_secs: 300 }
    }
}

/// Local call-rate throttle; unset means no throttle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub max_calls_per_minute: Option<u32>,
}
