//! Port interfaces for completion backends
//!
//! The client only needs "send request, get text or a classified error".
//! Transport, wire format and vendor live behind [`CompletionBackend`].

use std::time::Duration;

use async_trait::async_trait;
use relay_domain::{ChatMessage, ClassifiedError, GenerationParams};

/// One backend invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
    /// Per-call deadline the backend should apply to its own transport
    pub timeout: Duration,
}

/// Trait for issuing a single completion call
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue the call once. Retries are the caller's concern.
    async fn invoke(&self, request: &BackendRequest) -> Result<String, ClassifiedError>;
}
