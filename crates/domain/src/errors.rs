//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Relay
///
/// Covers configuration and adapter construction failures. Completion calls
/// themselves never surface errors to their callers.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// A backend failure, classified at the network boundary.
///
/// Retry and breaker decisions are made on the variant alone; the message is
/// for logs and diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedError {
    /// Credentials were rejected
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The backend asked us to slow down
    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String },

    /// No response within the per-call timeout
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// The backend could not be reached
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// The backend failed on its side
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    /// The backend rejected the request itself
    #[error("Client error (status {status}): {message}")]
    ClientError { status: u16, message: String },

    /// Anything that could not be classified
    #[error("Unclassified failure: {message}")]
    Unknown { message: String },
}

impl ClassifiedError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication { message: message.into() }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit { message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError { status, message: message.into() }
    }

    pub fn client(status: u16, message: impl Into<String>) -> Self {
        Self::ClientError { status, message: message.into() }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown { message: message.into() }
    }

    /// Classify an HTTP error status.
    ///
    /// 401/403 are authentication failures, 408 a timeout, 429 a rate limit,
    /// any other 4xx a client error and 5xx a server error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Authentication { message },
            408 => Self::Timeout { message },
            429 => Self::RateLimit { message },
            400..=499 => Self::ClientError { status, message },
            500..=599 => Self::ServerError { status, message },
            _ => Self::Unknown { message },
        }
    }

    /// Stable snake_case name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "authentication",
            Self::RateLimit { .. } => "rate_limit",
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::ServerError { .. } => "server_error",
            Self::ClientError { .. } => "client_error",
            Self::Unknown { .. } => "unknown",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message }
            | Self::RateLimit { message }
            | Self::Timeout { message }
            | Self::Connection { message }
            | Self::ServerError { message, .. }
            | Self::ClientError { message, .. }
            | Self::Unknown { message } => message,
        }
    }
}
