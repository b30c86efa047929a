//! Resilient completion domain

pub mod fingerprint;
pub mod health;
pub mod ports;
pub mod service;

pub use fingerprint::RequestFingerprint;
pub use health::{CacheHealth, ConfigInfo, FailureRecord, HealthStatus};
pub use ports::{BackendRequest, CompletionBackend};
pub use service::{estimate_tokens, CompletionClient};
