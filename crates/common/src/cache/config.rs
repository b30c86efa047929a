//! Cache configuration types and builder patterns

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Configuration for a bounded TTL + LRU cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of resident entries
    pub max_size: usize,

    /// Time-to-live for entries (None = no expiration)
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: 1000, ttl: Some(Duration::from_secs(3600)) }
    }
}

impl CacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Quick preset for a pure LRU cache without expiry
    ///
    /// # Example
    /// ```
    /// use relay_common::cache::CacheConfig;
    ///
    /// let config = CacheConfig::lru(1000);
    /// assert!(config.ttl.is_none());
    /// ```
    pub fn lru(max_size: usize) -> Self {
        Self { max_size, ttl: None }
    }

    /// Combined TTL + LRU cache
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use relay_common::cache::CacheConfig;
    ///
    /// let config = CacheConfig::ttl_lru(Duration::from_secs(3600), 1000);
    /// ```
    pub fn ttl_lru(ttl: Duration, max_size: usize) -> Self {
        Self { max_size, ttl: Some(ttl) }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.capacity().map(|_| ())
    }

    pub(crate) fn capacity(&self) -> ConfigResult<NonZeroUsize> {
        NonZeroUsize::new(self.max_size)
            .ok_or_else(|| ConfigError::invalid("cache max_size must be greater than 0"))
    }
}

/// Builder for CacheConfig with fluent API
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Set maximum cache size
    pub fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = size;
        self
    }

    /// Set time-to-live for entries
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.config.ttl = Some(duration);
        self
    }

    /// Disable expiry
    pub fn no_ttl(mut self) -> Self {
        self.config.ttl = None;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CacheConfig {
        self.config
    }
}
