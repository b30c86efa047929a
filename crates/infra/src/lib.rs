//! # Relay Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The HTTP completion backend (OpenAI-compatible endpoints)
//! - Configuration loading from the environment and files
//! - Logging setup
//! - Construction of the process-wide completion client
//!
//! ## Architecture
//! - Implements traits defined in `relay-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use bootstrap::{build_client, build_client_from_env};
pub use errors::InfraError;
pub use http::{HttpBackend, HttpClient};
pub use observability::{init_tracing, LogFormat};
