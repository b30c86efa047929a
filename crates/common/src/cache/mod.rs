//! Bounded, time-expiring, concurrency-safe cache
//!
//! # Features
//!
//! - **Thread-safe**: one `parking_lot::Mutex` around an `lru::LruCache`
//! - **Pure LRU eviction**: recency is refreshed on every hit and insert
//! - **Lazy TTL expiry**: expired entries are purged when read, and
//!   `sweep_expired` removes the rest on demand
//! - **Metrics**: hit/miss/insert/eviction/expiration counters
//! - **Testable**: clock abstraction for deterministic time-based testing
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use relay_common::cache::{CacheConfig, TtlLruCache};
//!
//! let config = CacheConfig::builder().max_size(500).ttl(Duration::from_secs(1800)).build();
//! let cache: TtlLruCache<String, String> = TtlLruCache::new(config).unwrap();
//!
//! cache.insert("prompt".to_string(), "answer".to_string());
//! assert_eq!(cache.get(&"prompt".to_string()).as_deref(), Some("answer"));
//!
//! let stats = cache.stats();
//! assert_eq!(stats.hits, 1);
//! ```

mod config;
mod core;
mod stats;

// Re-export public API
pub use self::core::TtlLruCache;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use stats::CacheStats;
