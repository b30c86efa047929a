//! HTTP adapters
//!
//! [`HttpClient`] wraps a configured reqwest client; [`HttpBackend`]
//! implements `CompletionBackend` for OpenAI-compatible endpoints on top of
//! it, classifying every failure at this boundary.

mod backend;
mod client;
mod types;

pub use backend::HttpBackend;
pub use client::{HttpClient, HttpClientBuilder};
