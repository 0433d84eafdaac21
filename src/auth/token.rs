use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::ResponseSnapshot;

/// Tokens returned by the token endpoint.
///
/// Absent tokens are empty strings. `Debug` reports which tokens are present
/// without printing their values.
///
/// # Example
/// ```
/// use entra_flows::auth::TokenResult;
///
/// let tokens: TokenResult =
///     serde_json::from_str(r#"{"access_token":"A","id_token":"I"}"#).unwrap();
/// assert_eq!(tokens.access_token, "A");
/// assert!(tokens.refresh_token.is_empty());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResult {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl TokenResult {
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    pub fn has_id_token(&self) -> bool {
        !self.id_token.is_empty()
    }

    /// Granted scopes, split on whitespace.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn presence(value: &str) -> &'static str {
            if value.is_empty() {
                "<empty>"
            } else {
                "<redacted>"
            }
        }
        f.debug_struct("TokenResult")
            .field("access_token", &presence(&self.access_token))
            .field("refresh_token", &presence(&self.refresh_token))
            .field("id_token", &presence(&self.id_token))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Tokens together with the HTTP response they were read from.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub tokens: TokenResult,
    pub response: ResponseSnapshot,
}

/// Error document returned by the provider with HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthError {
    #[serde(rename = "error")]
    pub code: String,
    #[serde(rename = "error_description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "error_uri", default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_codes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl OAuthError {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
            uri: None,
            error_codes: Vec::new(),
            trace_id: None,
            correlation_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => f.write_str(&self.code),
        }
    }
}

impl std::error::Error for OAuthError {}
