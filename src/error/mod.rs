//! Error types for entra-flows.

use thiserror::Error;

use crate::auth::OAuthError;

/// Failure of a flow operation.
///
/// A provider rejection (`OAuth`) is kept apart from transport and decoding
/// failures so callers can branch on it without string matching.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("OAuth error: {0}")]
    OAuth(OAuthError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl FlowError {
    /// The provider-reported error, if this is one.
    pub fn oauth_error(&self) -> Option<&OAuthError> {
        match self {
            Self::OAuth(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status carried by the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::OAuth(_) => Some(400),
            _ => None,
        }
    }

    /// Whether a caller-level retry could plausibly succeed.
    ///
    /// Flows never retry on their own; this is a hint for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::UnexpectedStatus { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FlowError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<OAuthError> for FlowError {
    fn from(error: OAuthError) -> Self {
        Self::OAuth(error)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_only_for_transport_and_server_side_statuses() {
        assert!(FlowError::Transport("reset".to_string()).is_retryable());
        assert!(FlowError::UnexpectedStatus {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(FlowError::UnexpectedStatus {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!FlowError::UnexpectedStatus {
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!FlowError::OAuth(OAuthError::new("invalid_grant")).is_retryable());
        assert!(!FlowError::Cancelled.is_retryable());
    }

    #[test]
    fn oauth_error_accessor_and_display() {
        let err = FlowError::from(
            OAuthError::new("invalid_grant").with_description("bad creds"),
        );
        assert_eq!(err.oauth_error().map(|e| e.code.as_str()), Some("invalid_grant"));
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "OAuth error: invalid_grant: bad creds");
    }

    #[test]
    fn serde_error_maps_to_decode() {
        let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();
        assert!(matches!(FlowError::from(serde_error), FlowError::Decode(_)));
    }
}
