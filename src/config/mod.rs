//! Configuration (layered: explicit values > env > `.env` file).

use reqwest::Url;
use secrecy::SecretString;
use strum::Display;

use crate::auth::AuthorizeRequest;
use crate::error::{FlowError, Result};

/// Public-cloud login host.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

pub const ENV_TENANT_ID: &str = "ENTRA_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "ENTRA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ENTRA_CLIENT_SECRET";
pub const ENV_SCOPE: &str = "ENTRA_SCOPE";
pub const ENV_REDIRECT_URI: &str = "ENTRA_REDIRECT_URI";
pub const ENV_AUTHORITY: &str = "ENTRA_AUTHORITY";

/// v2.0 endpoints under `{authority}/{tenant}/oauth2/v2.0/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Endpoint {
    Authorize,
    Token,
    DeviceCode,
}

/// Login host that the endpoint templates are resolved against.
///
/// Only the host is configurable (sovereign clouds, test servers); the
/// endpoint shapes are fixed.
///
/// # Example
/// ```
/// use entra_flows::config::{Authority, Endpoint};
///
/// let url = Authority::default().endpoint("contoso", Endpoint::DeviceCode).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://login.microsoftonline.com/contoso/oauth2/v2.0/devicecode"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    base: String,
}

impl Default for Authority {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHORITY)
    }
}

impl Authority {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve an endpoint URL for a tenant.
    ///
    /// The tenant may be a GUID, a domain, or one of `common`,
    /// `organizations`, `consumers`; it must be a single path segment.
    pub fn endpoint(&self, tenant_id: &str, endpoint: Endpoint) -> Result<Url> {
        let tenant = tenant_id.trim();
        if tenant.is_empty() {
            return Err(FlowError::InvalidRequest("tenant_id is empty".to_string()));
        }
        if tenant.contains(['/', '?', '#', '\\']) {
            return Err(FlowError::InvalidRequest(format!(
                "tenant_id {tenant:?} is not a single path segment"
            )));
        }
        let raw = format!("{}/{}/oauth2/v2.0/{}", self.base, tenant, endpoint);
        Url::parse(&raw)
            .map_err(|e| FlowError::Configuration(format!("invalid authority URL {raw}: {e}")))
    }

    pub fn token_url(&self, tenant_id: &str) -> Result<Url> {
        self.endpoint(tenant_id, Endpoint::Token)
    }

    pub fn device_code_url(&self, tenant_id: &str) -> Result<Url> {
        self.endpoint(tenant_id, Endpoint::DeviceCode)
    }

    /// Authorize URL for `request` on this host.
    pub fn authorize_url(&self, request: &AuthorizeRequest) -> Result<Url> {
        request.to_url(self)
    }
}

/// Defaults shared by the flows of one application registration.
///
/// Every field is optional here; the `require_*` accessors turn a missing
/// value into a [`FlowError::Configuration`] naming the env variable.
#[derive(Debug, Clone, Default)]
pub struct FlowConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub scope: Option<String>,
    pub redirect_uri: Option<String>,
    pub authority: Authority,
}

impl FlowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (`ENTRA_TENANT_ID`, `ENTRA_CLIENT_ID`, ...).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            tenant_id: get(ENV_TENANT_ID),
            client_id: get(ENV_CLIENT_ID),
            client_secret: get(ENV_CLIENT_SECRET).map(SecretString::new),
            scope: get(ENV_SCOPE),
            redirect_uri: get(ENV_REDIRECT_URI),
            authority: get(ENV_AUTHORITY).map(Authority::new).unwrap_or_default(),
        }
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = authority;
        self
    }

    pub fn require_tenant_id(&self) -> Result<&str> {
        require(self.tenant_id.as_deref(), ENV_TENANT_ID)
    }

    pub fn require_client_id(&self) -> Result<&str> {
        require(self.client_id.as_deref(), ENV_CLIENT_ID)
    }

    pub fn require_scope(&self) -> Result<&str> {
        require(self.scope.as_deref(), ENV_SCOPE)
    }

    pub fn require_redirect_uri(&self) -> Result<&str> {
        require(self.redirect_uri.as_deref(), ENV_REDIRECT_URI)
    }

    pub fn require_client_secret(&self) -> Result<&SecretString> {
        self.client_secret
            .as_ref()
            .ok_or_else(|| missing(ENV_CLIENT_SECRET))
    }
}

fn require<'a>(value: Option<&'a str>, env_key: &str) -> Result<&'a str> {
    value.ok_or_else(|| missing(env_key))
}

fn missing(env_key: &str) -> FlowError {
    FlowError::Configuration(format!("missing value (set {env_key} or pass it explicitly)"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn endpoint_templates_use_v2_paths() {
        let authority = Authority::default();
        assert_eq!(
            authority.token_url("tenant-1").unwrap().as_str(),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
        assert_eq!(
            authority
                .endpoint("tenant-1", Endpoint::Authorize)
                .unwrap()
                .as_str(),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/authorize"
        );
    }

    #[test]
    fn authority_trailing_slash_is_ignored() {
        let authority = Authority::new("http://127.0.0.1:8080/");
        assert_eq!(
            authority.device_code_url("common").unwrap().as_str(),
            "http://127.0.0.1:8080/common/oauth2/v2.0/devicecode"
        );
    }

    #[test]
    fn tenant_must_be_single_segment() {
        let authority = Authority::default();
        assert!(matches!(
            authority.token_url(""),
            Err(FlowError::InvalidRequest(_))
        ));
        assert!(matches!(
            authority.token_url("a/b"),
            Err(FlowError::InvalidRequest(_))
        ));
    }

    #[test]
    fn from_lookup_reads_known_keys_and_skips_blank_values() {
        let config = FlowConfig::from_lookup(lookup_from(&[
            (ENV_TENANT_ID, "contoso.onmicrosoft.com"),
            (ENV_CLIENT_ID, "client-1"),
            (ENV_CLIENT_SECRET, "s3cret"),
            (ENV_SCOPE, "  "),
            (ENV_AUTHORITY, "https://login.microsoftonline.us"),
        ]));
        assert_eq!(config.require_tenant_id().unwrap(), "contoso.onmicrosoft.com");
        assert_eq!(config.require_client_id().unwrap(), "client-1");
        assert_eq!(
            config.require_client_secret().unwrap().expose_secret(),
            "s3cret"
        );
        assert!(config.scope.is_none());
        assert_eq!(config.authority.base(), "https://login.microsoftonline.us");
    }

    #[test]
    fn explicit_values_override_lookup() {
        let config = FlowConfig::from_lookup(lookup_from(&[(ENV_SCOPE, "openid")]))
            .with_scope("https://graph.microsoft.com/.default");
        assert_eq!(
            config.require_scope().unwrap(),
            "https://graph.microsoft.com/.default"
        );
    }

    #[test]
    fn missing_value_names_env_variable() {
        let config = FlowConfig::new();
        let err = config.require_redirect_uri().unwrap_err();
        assert!(matches!(&err, FlowError::Configuration(msg) if msg.contains(ENV_REDIRECT_URI)));
    }
}
