//! Configuration service errors

use crate::error::CoreError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable response: network failure or a body that does not decode
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status; displays the
    /// service's own message
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// The client was built without a required URL or namespace
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Rejection carrying the response body, or the status reason when the
    /// service sent none
    pub fn rejected(status: StatusCode, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_string)
        } else {
            body.to_string()
        };
        Self::Rejected { status, message }
    }

    /// Status the service answered with, if it answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Request(err) => err.status(),
            Self::Configuration(_) => None,
        }
    }
}

impl From<ClientError> for CoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Configuration(message) => Self::invalid_config(message),
            other => Self::fetch(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_falls_back_to_status_reason() {
        let err = ClientError::rejected(StatusCode::SERVICE_UNAVAILABLE, "  ");
        assert_eq!(err.to_string(), "Service Unavailable");
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));

        let err = ClientError::rejected(StatusCode::NOT_FOUND, "no such parameter");
        assert_eq!(err.to_string(), "no such parameter");
    }

    #[test]
    fn test_configuration_errors_stay_configuration_errors() {
        let err: CoreError = ClientError::Configuration("base_url is required".into()).into();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));

        let err: CoreError = ClientError::rejected(StatusCode::FORBIDDEN, "").into();
        assert_eq!(err.to_string(), "Forbidden");
    }
}
