use tracing::{debug, warn};

use crate::auth::grant::{
    AuthorizationCodeRequest, ClientCredentialsRequest, DeviceCodeTokenRequest, OnBehalfOfRequest,
    PasswordRequest, RefreshTokenRequest, TokenGrant,
};
use crate::auth::token::{OAuthError, TokenResponse, TokenResult};
use crate::config::Authority;
use crate::error::{FlowError, Result};
use crate::http::{post_form, shared_client, ResponseSnapshot};

/// Token-endpoint client shared by every grant.
///
/// One POST per call, no retries. Cloning is cheap and shares the
/// connection pool.
///
/// # Example
/// ```no_run
/// use entra_flows::auth::{ClientCredentialsRequest, TokenClient};
///
/// # async fn example() -> entra_flows::error::Result<()> {
/// let client = TokenClient::new();
/// let tokens = client
///     .client_credentials(ClientCredentialsRequest::new(
///         "contoso.onmicrosoft.com",
///         "11111111-2222-3333-4444-555555555555",
///         "client-secret",
///         "https://graph.microsoft.com/.default",
///     ))
///     .await?;
/// println!("{}", tokens.access_token);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    authority: Authority,
}

impl Default for TokenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenClient {
    pub fn new() -> Self {
        Self {
            http: shared_client().clone(),
            authority: Authority::default(),
        }
    }

    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = authority;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn exchange(&self, grant: &TokenGrant) -> Result<TokenResult> {
        Ok(self.exchange_with_response(grant).await?.tokens)
    }

    /// Like [`exchange`](Self::exchange), also returning the captured response.
    pub async fn exchange_with_response(&self, grant: &TokenGrant) -> Result<TokenResponse> {
        let url = self.authority.token_url(grant.tenant_id())?;
        let form = grant.form()?;
        debug!(
            grant_type = %grant.grant_type(),
            tenant = grant.tenant_id(),
            params = ?form.names(),
            "token request"
        );
        let response = post_form(&self.http, url, &form).await?;
        let tokens = parse_token_response(&response)?;
        debug!(
            grant_type = %grant.grant_type(),
            refresh_token = tokens.has_refresh_token(),
            id_token = tokens.has_id_token(),
            "token request succeeded"
        );
        Ok(TokenResponse { tokens, response })
    }

    pub async fn client_credentials(&self, request: ClientCredentialsRequest) -> Result<TokenResult> {
        self.exchange(&request.into()).await
    }

    pub async fn device_code_token(&self, request: DeviceCodeTokenRequest) -> Result<TokenResult> {
        self.exchange(&request.into()).await
    }

    pub async fn on_behalf_of(&self, request: OnBehalfOfRequest) -> Result<TokenResult> {
        self.exchange(&request.into()).await
    }

    pub async fn password(&self, request: PasswordRequest) -> Result<TokenResult> {
        self.exchange(&request.into()).await
    }

    pub async fn redeem_code(&self, request: AuthorizationCodeRequest) -> Result<TokenResult> {
        self.exchange(&request.into()).await
    }

    pub async fn refresh(&self, request: RefreshTokenRequest) -> Result<TokenResult> {
        self.exchange(&request.into()).await
    }
}

/// Interpret a token-endpoint response.
///
/// 200 must carry an `access_token`; 400 is the provider's error document;
/// anything else is reported with its raw body.
pub(crate) fn parse_token_response(response: &ResponseSnapshot) -> Result<TokenResult> {
    match response.status {
        200 => {
            let tokens: TokenResult = serde_json::from_str(&response.body)
                .map_err(|e| FlowError::Decode(format!("token response: {e}")))?;
            if tokens.access_token.is_empty() {
                return Err(FlowError::Decode(
                    "token response has no access_token".to_string(),
                ));
            }
            Ok(tokens)
        }
        400 => Err(provider_error(response)),
        status => {
            warn!(status, "unexpected token endpoint status");
            Err(FlowError::UnexpectedStatus {
                status,
                body: response.body.clone(),
            })
        }
    }
}

/// Turn a 400 response into [`FlowError::OAuth`], or into
/// [`FlowError::UnexpectedStatus`] when the body is not an error document.
pub(crate) fn provider_error(response: &ResponseSnapshot) -> FlowError {
    match serde_json::from_str::<OAuthError>(&response.body) {
        Ok(error) => {
            warn!(
                code = %error.code,
                description = error.description.as_deref().unwrap_or_default(),
                "provider rejected request"
            );
            FlowError::OAuth(error)
        }
        Err(_) => FlowError::UnexpectedStatus {
            status: response.status,
            body: response.body.clone(),
        },
    }
}
