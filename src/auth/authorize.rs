//! Authorize-endpoint URLs for the interactive flows.
//!
//! Authorization-code, hybrid and implicit requests share one builder; the
//! [`AuthorizeFlow`] only picks defaults and validation. No request is sent:
//! the URL is opened in a browser and the result arrives at the redirect URI.

use bon::Builder;
use reqwest::Url;
use strum::Display;

use crate::auth::pkce::PkcePair;
use crate::config::{Authority, Endpoint};
use crate::error::{FlowError, Result};

/// Interactive flow an authorize URL is built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuthorizeFlow {
    /// `response_type=code`, `response_mode=query`.
    #[default]
    AuthorizationCode,
    /// Code plus tokens in one response (`code id_token` by default).
    Hybrid,
    /// Tokens straight from the authorize endpoint (`id_token token` by default).
    Implicit,
}

impl AuthorizeFlow {
    pub fn default_response_type(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "code",
            Self::Hybrid => "code id_token",
            Self::Implicit => "id_token token",
        }
    }

    pub fn default_response_mode(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "query",
            Self::Hybrid | Self::Implicit => "fragment",
        }
    }
}

/// Parameters of one authorize request.
///
/// # Example
/// ```
/// use entra_flows::auth::{AuthorizeFlow, AuthorizeRequest};
/// use entra_flows::config::Authority;
///
/// let url = AuthorizeRequest::builder()
///     .flow(AuthorizeFlow::Hybrid)
///     .tenant_id("common")
///     .client_id("my-app")
///     .redirect_uri("http://localhost:8400/callback")
///     .scope("openid profile offline_access")
///     .state("A1B2C3")
///     .nonce("123456")
///     .build()
///     .to_url(&Authority::default())
///     .unwrap();
/// assert!(url.as_str().contains("response_type=code+id_token"));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct AuthorizeRequest {
    #[builder(default)]
    pub flow: AuthorizeFlow,
    #[builder(into)]
    pub tenant_id: String,
    #[builder(into)]
    pub client_id: String,
    #[builder(into)]
    pub scope: String,
    #[builder(into)]
    pub redirect_uri: Option<String>,
    /// Overrides the flow's default response type.
    #[builder(into)]
    pub response_type: Option<String>,
    /// Overrides the flow's default response mode.
    #[builder(into)]
    pub response_mode: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub nonce: Option<String>,
    #[builder(into)]
    pub code_challenge: Option<String>,
    /// Only sent together with `code_challenge`.
    #[builder(into)]
    pub code_challenge_method: Option<String>,
    #[builder(into)]
    pub prompt: Option<String>,
    #[builder(into)]
    pub login_hint: Option<String>,
    #[builder(into)]
    pub domain_hint: Option<String>,
}

impl AuthorizeRequest {
    /// `response_type=code`, `response_mode=query`.
    pub fn authorization_code(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::builder()
            .tenant_id(tenant_id)
            .client_id(client_id)
            .redirect_uri(redirect_uri)
            .scope(scope)
            .build()
    }

    /// Code and tokens in one response, e.g. `code id_token`.
    pub fn hybrid(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
        response_type: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self::builder()
            .flow(AuthorizeFlow::Hybrid)
            .tenant_id(tenant_id)
            .client_id(client_id)
            .redirect_uri(redirect_uri)
            .scope(scope)
            .response_type(response_type)
            .nonce(nonce)
            .build()
    }

    /// Tokens straight from the authorize endpoint (`id_token token`).
    pub fn implicit(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self::builder()
            .flow(AuthorizeFlow::Implicit)
            .tenant_id(tenant_id)
            .client_id(client_id)
            .redirect_uri(redirect_uri)
            .scope(scope)
            .nonce(nonce)
            .build()
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Use the challenge half of a PKCE pair.
    pub fn with_pkce(mut self, pkce: &PkcePair) -> Self {
        self.code_challenge = Some(pkce.challenge().to_string());
        self.code_challenge_method = Some(pkce.method().to_string());
        self
    }

    pub fn response_type(&self) -> &str {
        non_empty(self.response_type.as_deref()).unwrap_or(self.flow.default_response_type())
    }

    pub fn response_mode(&self) -> &str {
        non_empty(self.response_mode.as_deref()).unwrap_or(self.flow.default_response_mode())
    }

    /// Query parameters in the order they appear in the URL.
    ///
    /// Empty values are skipped; `code_challenge_method` is dropped when
    /// there is no `code_challenge`.
    pub fn query_pairs(&self) -> Result<Vec<(&'static str, &str)>> {
        self.validate()?;
        let challenge = non_empty(self.code_challenge.as_deref());
        let method = challenge.and(non_empty(self.code_challenge_method.as_deref()));
        let candidates = [
            ("client_id", Some(self.client_id.as_str())),
            ("response_type", Some(self.response_type())),
            ("redirect_uri", non_empty(self.redirect_uri.as_deref())),
            ("response_mode", Some(self.response_mode())),
            ("scope", Some(self.scope.as_str())),
            ("state", non_empty(self.state.as_deref())),
            ("nonce", non_empty(self.nonce.as_deref())),
            ("code_challenge", challenge),
            ("code_challenge_method", method),
            ("prompt", non_empty(self.prompt.as_deref())),
            ("login_hint", non_empty(self.login_hint.as_deref())),
            ("domain_hint", non_empty(self.domain_hint.as_deref())),
        ];
        Ok(candidates
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect())
    }

    /// Build the percent-encoded authorize URL.
    pub fn to_url(&self, authority: &Authority) -> Result<Url> {
        let mut url = authority.endpoint(&self.tenant_id, Endpoint::Authorize)?;
        let pairs = self.query_pairs()?;
        url.query_pairs_mut().extend_pairs(pairs);
        Ok(url)
    }

    fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(FlowError::InvalidRequest("client_id is required".to_string()));
        }
        if self.scope.trim().is_empty() {
            return Err(FlowError::InvalidRequest("scope is required".to_string()));
        }
        let wants_id_token = self
            .response_type()
            .split_whitespace()
            .any(|part| part == "id_token");
        if wants_id_token && non_empty(self.nonce.as_deref()).is_none() {
            return Err(FlowError::InvalidRequest(format!(
                "nonce is required for response_type {:?}",
                self.response_type()
            )));
        }
        if self.flow == AuthorizeFlow::Implicit && non_empty(self.code_challenge.as_deref()).is_some() {
            return Err(FlowError::InvalidRequest(
                "code_challenge is not used by the implicit flow".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
