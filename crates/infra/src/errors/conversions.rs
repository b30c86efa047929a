//! Conversions from external infrastructure errors into domain errors.

use relay_domain::{ClassifiedError, RelayError};
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RelayError);

impl From<InfraError> for RelayError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RelayError> for InfraError {
    fn from(value: RelayError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RelayError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        if value.is_builder() {
            return InfraError(RelayError::Config(format!("invalid HTTP client setup: {value}")));
        }
        if value.is_timeout() {
            return InfraError(RelayError::Network("HTTP request timed out".into()));
        }
        if value.is_connect() {
            return InfraError(RelayError::Network("HTTP connection failure".into()));
        }
        if let Some(status) = value.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return InfraError(match code {
                401 | 403 => RelayError::Auth(message),
                400..=499 => RelayError::InvalidInput(message),
                _ => RelayError::Network(message),
            });
        }

        InfraError(RelayError::Network(value.to_string()))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ClassifiedError */
/* -------------------------------------------------------------------------- */

/// Classify a transport-level failure for the retry loop.
///
/// Status-bearing failures go through [`ClassifiedError::from_status`];
/// body decode failures are unclassified.
pub fn classify_transport_error(error: &HttpError) -> ClassifiedError {
    if error.is_timeout() {
        return ClassifiedError::timeout(error.to_string());
    }
    if error.is_connect() {
        return ClassifiedError::connection(error.to_string());
    }
    if let Some(status) = error.status() {
        return ClassifiedError::from_status(status.as_u16(), error.to_string());
    }
    if error.is_request() {
        return ClassifiedError::connection(error.to_string());
    }

    ClassifiedError::unknown(error.to_string())
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
