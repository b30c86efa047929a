//! OpenAI-compatible chat completions backend
use async_trait::async_trait;
use relay_core::{BackendRequest, CompletionBackend};
use relay_domain::{ClassifiedError, CompletionConfig, RelayError};
use reqwest::Method;
use tracing::debug;

use super::client::HttpClient;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use crate::errors::classify_transport_error;

const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a failure message
const MAX_ERROR_BODY: usize = 512;

/// Completion backend speaking the chat completions protocol over HTTP
///
/// Works against any provider exposing `POST {base_url}/chat/completions`
/// with bearer authentication.
pub struct HttpBackend {
    http_client: HttpClient,
    api_key: String,
    endpoint: String,
}

impl HttpBackend {
    /// Create a backend for the configured provider
    ///
    /// # Errors
    /// Returns `RelayError::Config` if the HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self, RelayError> {
        let http_client =
            HttpClient::builder().timeout(config.timeout()).user_agent(USER_AGENT).build()?;

        Ok(Self::with_http_client(
            http_client,
            config.api_key.clone().unwrap_or_default(),
            config.effective_base_url(),
        ))
    }

    pub fn with_http_client(
        http_client: HttpClient,
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Map an error status and its body to a failure class
    async fn handle_error_status(status: u16, response: reqwest::Response) -> ClassifiedError {
        let mut message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        if message.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY).rev().find(|i| message.is_char_boundary(*i)).unwrap_or(0);
            message.truncate(cut);
        }
        ClassifiedError::from_status(status, message)
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn invoke(&self, request: &BackendRequest) -> Result<String, ClassifiedError> {
        let payload = ChatCompletionRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            extra: &request.params.extra,
        };

        let builder = self
            .http_client
            .request(Method::POST, &self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(request.timeout)
            .json(&payload);

        let response =
            self.http_client.send(builder).await.map_err(|err| classify_transport_error(&err))?;

        let status = response.status();
        debug!(status = status.as_u16(), model = %request.model, "Received completion response");

        if !status.is_success() {
            return Err(Self::handle_error_status(status.as_u16(), response).await);
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                ClassifiedError::timeout(err.to_string())
            } else {
                ClassifiedError::unknown(format!("Failed to parse response: {err}"))
            }
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClassifiedError::unknown("Response contained no choices"))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
