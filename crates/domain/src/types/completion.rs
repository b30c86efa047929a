//! Per-call completion options and the resolved generation parameters

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-facing knobs for one completion call
///
/// Unset values fall back to the client's configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Serve from and store into the response cache
    pub use_cache: bool,
    /// Single attempt, no backoff
    pub quick_mode: bool,
    /// Extra backend parameters (e.g. `top_p`), part of the cache key
    pub extra: BTreeMap<String, Value>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            use_cache: true,
            quick_mode: false,
            extra: BTreeMap::new(),
        }
    }
}

impl CompletionOptions {
    /// Options for latency-sensitive, user-facing calls
    pub fn quick() -> Self {
        Self { quick_mode: true, ..Self::default() }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Fill unset values from the configured defaults
    pub fn resolve(&self, default_temperature: f32, default_max_tokens: u32) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature.unwrap_or(default_temperature),
            max_tokens: self.max_tokens.unwrap_or(default_max_tokens),
            extra: self.extra.clone(),
        }
    }
}

/// Generation parameters after defaults have been applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GenerationParams {
    /// All parameters as one sorted map, the shape hashed into cache keys.
    pub fn to_sorted_map(&self) -> BTreeMap<String, Value> {
        let mut map = self.extra.clone();
        map.insert("temperature".to_string(), Value::from(self.temperature));
        map.insert("max_tokens".to_string(), Value::from(self.max_tokens));
        map
    }
}
