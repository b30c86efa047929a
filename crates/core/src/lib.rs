//! # Relay Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The completion client orchestrating breaker, retries and cache
//! - Port interfaces (traits) for completion backends
//! - Health and configuration views
//!
//! ## Architecture Principles
//! - Only depends on `relay-common` and `relay-domain`
//! - No HTTP or platform code
//! - Backends are reached through the `CompletionBackend` trait

pub mod completion;

pub use completion::ports::{BackendRequest, CompletionBackend};
pub use completion::{
    estimate_tokens, CacheHealth, CompletionClient, ConfigInfo, FailureRecord, HealthStatus,
    RequestFingerprint,
};
