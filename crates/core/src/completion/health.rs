//! Diagnostic views of the completion client

use chrono::{DateTime, Utc};
use relay_common::{BreakerSnapshot, CacheStats};
use relay_domain::{ClassifiedError, Provider};
use serde::{Deserialize, Serialize};

/// Cache counters exposed through health checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheHealth {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage, rounded to two decimals
    pub hit_rate: f64,
}

impl From<&CacheStats> for CacheHealth {
    fn from(stats: &CacheStats) -> Self {
        Self {
            size: stats.size,
            max_size: stats.max_size,
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate_percent(),
        }
    }
}

/// Most recent terminal failure of a completion call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(error: &ClassifiedError, at: DateTime<Utc>) -> Self {
        Self { kind: error.kind().to_string(), message: error.message().to_string(), at }
    }
}

/// Result of `CompletionClient::health_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub enabled: bool,
    pub available: bool,
    pub breaker: BreakerSnapshot,
    /// `None` when response caching is turned off
    pub cache: Option<CacheHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<FailureRecord>,
}

/// Effective client configuration, without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub enabled: bool,
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub rate_limit_wait_secs: u64,
    pub cache_enabled: bool,
    pub max_calls_per_minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}
