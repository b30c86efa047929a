//! Process-wide client construction
//!
//! Hosts build one [`CompletionClient`] at startup and share the returned
//! `Arc` with every consumer.

use std::sync::Arc;

use relay_core::CompletionClient;
use relay_domain::{RelayConfig, Result};
use tracing::info;

use crate::config;
use crate::http::HttpBackend;

/// Build the shared client over the HTTP backend.
///
/// # Errors
/// Returns `RelayError::Config` if the configuration is invalid or the HTTP
/// client cannot be created.
pub fn build_client(config: RelayConfig) -> Result<Arc<CompletionClient>> {
    let backend = HttpBackend::new(&config.completion)?;
    info!(endpoint = backend.endpoint(), "Completion backend ready");

    let client = CompletionClient::new(config, Arc::new(backend))?;
    Ok(Arc::new(client))
}

/// Load configuration with [`config::load`] and build the shared client.
///
/// Missing credentials yield a disabled client rather than an error.
///
/// # Errors
/// Returns `RelayError::Config` if a config file or environment value is
/// invalid.
pub fn build_client_from_env() -> Result<Arc<CompletionClient>> {
    build_client(config::load()?)
}
