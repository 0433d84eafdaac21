//! Grant descriptors for the token endpoint.
//!
//! Each request type carries exactly the parameters its grant accepts;
//! [`TokenGrant::form`] turns it into the form body.

use secrecy::{ExposeSecret, SecretString};
use strum::{Display, EnumString};

use crate::error::{FlowError, Result};
use crate::http::FormParams;

/// Fixed `client_assertion_type` sent with every `client_assertion`.
pub const CLIENT_ASSERTION_TYPE_JWT_BEARER: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// `requested_token_type` values accepted by the on-behalf-of grant.
pub const TOKEN_TYPE_SAML2: &str = "urn:ietf:params:oauth:token-type:saml2";
pub const TOKEN_TYPE_SAML1: &str = "urn:ietf:params:oauth:token-type:saml1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum GrantType {
    #[strum(to_string = "client_credentials")]
    ClientCredentials,
    #[strum(to_string = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceCode,
    #[strum(to_string = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
    OnBehalfOf,
    #[strum(to_string = "password")]
    Password,
    #[strum(to_string = "authorization_code")]
    AuthorizationCode,
    #[strum(to_string = "refresh_token")]
    RefreshToken,
}

/// Optional confidential-client credentials.
///
/// Setting an assertion always implies
/// `client_assertion_type=`[`CLIENT_ASSERTION_TYPE_JWT_BEARER`].
#[derive(Debug, Clone, Default)]
pub struct ClientAuth {
    pub client_secret: Option<SecretString>,
    pub client_assertion: Option<SecretString>,
}

impl ClientAuth {
    /// No client credentials (public client).
    pub fn public() -> Self {
        Self::default()
    }

    pub fn secret(client_secret: impl Into<String>) -> Self {
        Self::public().with_secret(client_secret)
    }

    pub fn assertion(client_assertion: impl Into<String>) -> Self {
        Self::public().with_assertion(client_assertion)
    }

    pub fn with_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    pub fn with_assertion(mut self, client_assertion: impl Into<String>) -> Self {
        self.client_assertion = Some(SecretString::new(client_assertion.into()));
        self
    }

    fn append_to(&self, form: &mut FormParams) {
        form.push_opt(
            "client_secret",
            self.client_secret.as_ref().map(|s| s.expose_secret().as_str()),
        );
        if let Some(assertion) = &self.client_assertion {
            form.push("client_assertion", assertion.expose_secret().as_str());
            form.push("client_assertion_type", CLIENT_ASSERTION_TYPE_JWT_BEARER);
        }
    }
}

/// App-only token with a client secret.
#[derive(Debug, Clone)]
pub struct ClientCredentialsRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub scope: String,
}

impl ClientCredentialsRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            scope: scope.into(),
        }
    }
}

/// Token-phase request of the device authorization grant.
#[derive(Debug, Clone)]
pub struct DeviceCodeTokenRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub device_code: String,
}

impl DeviceCodeTokenRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        device_code: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            device_code: device_code.into(),
        }
    }
}

/// Exchange an incoming user token for a downstream one (middle-tier API).
#[derive(Debug, Clone)]
pub struct OnBehalfOfRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub assertion: SecretString,
    pub scope: String,
    pub client_auth: ClientAuth,
    pub code_verifier: Option<SecretString>,
    pub requested_token_type: Option<String>,
}

impl OnBehalfOfRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        assertion: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            assertion: SecretString::new(assertion.into()),
            scope: scope.into(),
            client_auth: ClientAuth::public(),
            code_verifier: None,
            requested_token_type: None,
        }
    }

    pub fn with_client_auth(mut self, client_auth: ClientAuth) -> Self {
        self.client_auth = client_auth;
        self
    }

    pub fn with_code_verifier(mut self, code_verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(SecretString::new(code_verifier.into()));
        self
    }

    /// e.g. [`TOKEN_TYPE_SAML2`] for APIs that need a SAML token.
    pub fn with_requested_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.requested_token_type = Some(token_type.into());
        self
    }
}

/// Resource owner password credentials.
#[derive(Debug, Clone)]
pub struct PasswordRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub scope: String,
    pub username: String,
    pub password: SecretString,
    pub client_auth: ClientAuth,
}

impl PasswordRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            scope: scope.into(),
            username: username.into(),
            password: SecretString::new(password.into()),
            client_auth: ClientAuth::public(),
        }
    }

    pub fn with_client_auth(mut self, client_auth: ClientAuth) -> Self {
        self.client_auth = client_auth;
        self
    }
}

/// Redeem an authorization code returned to the redirect URI.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub code: SecretString,
    pub redirect_uri: String,
    pub client_auth: ClientAuth,
    pub code_verifier: Option<SecretString>,
}

impl AuthorizationCodeRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        code: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            code: SecretString::new(code.into()),
            redirect_uri: redirect_uri.into(),
            client_auth: ClientAuth::public(),
            code_verifier: None,
        }
    }

    pub fn with_client_auth(mut self, client_auth: ClientAuth) -> Self {
        self.client_auth = client_auth;
        self
    }

    pub fn with_code_verifier(mut self, code_verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(SecretString::new(code_verifier.into()));
        self
    }
}

/// Redeem a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    pub scope: Option<String>,
}

impl RefreshTokenRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// One token-endpoint grant with its parameters.
#[derive(Debug, Clone)]
pub enum TokenGrant {
    ClientCredentials(ClientCredentialsRequest),
    DeviceCode(DeviceCodeTokenRequest),
    OnBehalfOf(OnBehalfOfRequest),
    Password(PasswordRequest),
    AuthorizationCode(AuthorizationCodeRequest),
    RefreshToken(RefreshTokenRequest),
}

impl TokenGrant {
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::ClientCredentials(_) => GrantType::ClientCredentials,
            Self::DeviceCode(_) => GrantType::DeviceCode,
            Self::OnBehalfOf(_) => GrantType::OnBehalfOf,
            Self::Password(_) => GrantType::Password,
            Self::AuthorizationCode(_) => GrantType::AuthorizationCode,
            Self::RefreshToken(_) => GrantType::RefreshToken,
        }
    }

    pub fn tenant_id(&self) -> &str {
        match self {
            Self::ClientCredentials(r) => &r.tenant_id,
            Self::DeviceCode(r) => &r.tenant_id,
            Self::OnBehalfOf(r) => &r.tenant_id,
            Self::Password(r) => &r.tenant_id,
            Self::AuthorizationCode(r) => &r.tenant_id,
            Self::RefreshToken(r) => &r.tenant_id,
        }
    }

    /// Build the form body. Blank required parameters are rejected.
    pub fn form(&self) -> Result<FormParams> {
        let mut form = FormParams::new();
        form.push("grant_type", self.grant_type().to_string());
        match self {
            Self::ClientCredentials(r) => {
                required(&mut form, "client_id", &r.client_id)?;
                required(&mut form, "client_secret", r.client_secret.expose_secret())?;
                required(&mut form, "scope", &r.scope)?;
            }
            Self::DeviceCode(r) => {
                required(&mut form, "client_id", &r.client_id)?;
                required(&mut form, "device_code", &r.device_code)?;
            }
            Self::OnBehalfOf(r) => {
                required(&mut form, "client_id", &r.client_id)?;
                required(&mut form, "assertion", r.assertion.expose_secret())?;
                required(&mut form, "scope", &r.scope)?;
                form.push("requested_token_use", "on_behalf_of");
                r.client_auth.append_to(&mut form);
                form.push_opt(
                    "code_verifier",
                    r.code_verifier.as_ref().map(|v| v.expose_secret().as_str()),
                );
                form.push_opt("requested_token_type", r.requested_token_type.as_deref());
            }
            Self::Password(r) => {
                required(&mut form, "client_id", &r.client_id)?;
                required(&mut form, "scope", &r.scope)?;
                required(&mut form, "username", &r.username)?;
                required(&mut form, "password", r.password.expose_secret())?;
                r.client_auth.append_to(&mut form);
            }
            Self::AuthorizationCode(r) => {
                required(&mut form, "code", r.code.expose_secret())?;
                required(&mut form, "redirect_uri", &r.redirect_uri)?;
                required(&mut form, "client_id", &r.client_id)?;
                r.client_auth.append_to(&mut form);
                form.push_opt(
                    "code_verifier",
                    r.code_verifier.as_ref().map(|v| v.expose_secret().as_str()),
                );
            }
            Self::RefreshToken(r) => {
                required(&mut form, "client_id", &r.client_id)?;
                required(&mut form, "client_secret", r.client_secret.expose_secret())?;
                required(&mut form, "refresh_token", r.refresh_token.expose_secret())?;
                form.push_opt("scope", r.scope.as_deref());
            }
        }
        Ok(form)
    }
}

impl From<ClientCredentialsRequest> for TokenGrant {
    fn from(request: ClientCredentialsRequest) -> Self {
        Self::ClientCredentials(request)
    }
}

impl From<DeviceCodeTokenRequest> for TokenGrant {
    fn from(request: DeviceCodeTokenRequest) -> Self {
        Self::DeviceCode(request)
    }
}

impl From<OnBehalfOfRequest> for TokenGrant {
    fn from(request: OnBehalfOfRequest) -> Self {
        Self::OnBehalfOf(request)
    }
}

impl From<PasswordRequest> for TokenGrant {
    fn from(request: PasswordRequest) -> Self {
        Self::Password(request)
    }
}

impl From<AuthorizationCodeRequest> for TokenGrant {
    fn from(request: AuthorizationCodeRequest) -> Self {
        Self::AuthorizationCode(request)
    }
}

impl From<RefreshTokenRequest> for TokenGrant {
    fn from(request: RefreshTokenRequest) -> Self {
        Self::RefreshToken(request)
    }
}

fn required(form: &mut FormParams, name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FlowError::InvalidRequest(format!("{name} is required")));
    }
    form.push(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn grant_type_strings_match_wire_values() {
        assert_eq!(GrantType::ClientCredentials.to_string(), "client_credentials");
        assert_eq!(
            GrantType::DeviceCode.to_string(),
            "urn:ietf:params:oauth:grant-type:device_code"
        );
        assert_eq!(
            GrantType::OnBehalfOf.to_string(),
            "urn:ietf:params:oauth:grant-type:jwt-bearer"
        );
        assert_eq!(GrantType::from_str("password").unwrap(), GrantType::Password);
    }

    #[test]
    fn client_credentials_form_has_exact_parameters() {
        let grant = TokenGrant::from(ClientCredentialsRequest::new(
            "t",
            "c",
            "s",
            "https://graph.microsoft.com/.default",
        ));
        let form = grant.form().unwrap();
        assert_eq!(
            form.names(),
            vec!["grant_type", "client_id", "client_secret", "scope"]
        );
        assert_eq!(form.get("grant_type"), Some("client_credentials"));
    }

    #[test]
    fn on_behalf_of_sets_fixed_token_use_and_optional_fields() {
        let grant = TokenGrant::from(
            OnBehalfOfRequest::new("t", "c", "incoming-jwt", "api://downstream/.default")
                .with_client_auth(ClientAuth::secret("s"))
                .with_requested_token_type(TOKEN_TYPE_SAML2),
        );
        let form = grant.form().unwrap();
        assert_eq!(form.get("requested_token_use"), Some("on_behalf_of"));
        assert_eq!(form.get("assertion"), Some("incoming-jwt"));
        assert_eq!(form.get("client_secret"), Some("s"));
        assert_eq!(form.get("requested_token_type"), Some(TOKEN_TYPE_SAML2));
        assert!(!form.contains("client_assertion"));
        assert!(!form.contains("client_assertion_type"));
        assert!(!form.contains("code_verifier"));
    }

    #[test]
    fn client_assertion_always_carries_jwt_bearer_type() {
        let auth = ClientAuth::assertion("signed-jwt");
        let grants: Vec<TokenGrant> = vec![
            OnBehalfOfRequest::new("t", "c", "a", "s")
                .with_client_auth(auth.clone())
                .into(),
            PasswordRequest::new("t", "c", "s", "user@contoso.com", "pw")
                .with_client_auth(auth.clone())
                .into(),
            AuthorizationCodeRequest::new("t", "c", "code", "http://localhost")
                .with_client_auth(auth)
                .into(),
        ];
        for grant in grants {
            let form = grant.form().unwrap();
            assert_eq!(form.get("client_assertion"), Some("signed-jwt"));
            assert_eq!(
                form.get("client_assertion_type"),
                Some(CLIENT_ASSERTION_TYPE_JWT_BEARER)
            );
        }
    }

    #[test]
    fn authorization_code_includes_verifier_when_given() {
        let form = TokenGrant::from(
            AuthorizationCodeRequest::new("t", "c", "the-code", "http://localhost/cb")
                .with_code_verifier("verifier"),
        )
        .form()
        .unwrap();
        assert_eq!(
            form.names(),
            vec!["grant_type", "code", "redirect_uri", "client_id", "code_verifier"]
        );
    }

    #[test]
    fn refresh_omits_scope_unless_given() {
        let without = TokenGrant::from(RefreshTokenRequest::new("t", "c", "s", "r"))
            .form()
            .unwrap();
        assert!(!without.contains("scope"));

        let with = TokenGrant::from(RefreshTokenRequest::new("t", "c", "s", "r").with_scope("openid"))
            .form()
            .unwrap();
        assert_eq!(with.get("scope"), Some("openid"));
    }

    #[test]
    fn device_code_form_is_minimal() {
        let form = TokenGrant::from(DeviceCodeTokenRequest::new("t", "c", "dc"))
            .form()
            .unwrap();
        assert_eq!(form.names(), vec!["grant_type", "client_id", "device_code"]);
    }

    #[test]
    fn blank_required_parameter_is_rejected() {
        let result = TokenGrant::from(PasswordRequest::new("t", "c", "s", "", "pw")).form();
        assert!(matches!(result, Err(FlowError::InvalidRequest(msg)) if msg.contains("username")));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let request = PasswordRequest::new("t", "c", "s", "user", "hunter2")
            .with_client_auth(ClientAuth::secret("app-secret"));
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("app-secret"));
    }
}
