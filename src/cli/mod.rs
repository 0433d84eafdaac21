//! CLI entry point for entra-flows.

pub mod flows;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::auth::AuthorizeFlow;
use crate::config::{Authority, FlowConfig};

/// entra-flows CLI
#[derive(Parser, Debug)]
#[command(name = "entra-flows", version, about = "OAuth2 flows for the Microsoft identity platform")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every flow. Unset values fall back to `ENTRA_*` env vars.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Tenant GUID, domain, or common/organizations/consumers
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// Application (client) ID
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Login host, e.g. https://login.microsoftonline.us
    #[arg(long, global = true)]
    pub authority: Option<String>,

    /// Print the raw HTTP response of the final token request
    #[arg(long, global = true)]
    pub show_response: bool,
}

impl GlobalArgs {
    /// Layer explicit flags over an env-derived config.
    pub fn apply(&self, mut config: FlowConfig) -> FlowConfig {
        if let Some(tenant) = &self.tenant {
            config = config.with_tenant_id(tenant);
        }
        if let Some(client_id) = &self.client_id {
            config = config.with_client_id(client_id);
        }
        if let Some(authority) = &self.authority {
            config = config.with_authority(Authority::new(authority));
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print an authorize URL to open in a browser
    AuthorizeUrl(AuthorizeUrlArgs),
    /// App-only token with a client secret
    ClientCredentials(ClientCredentialsArgs),
    /// Sign in on another device with a user code
    DeviceCode(DeviceCodeArgs),
    /// Exchange an incoming token for a downstream one
    OnBehalfOf(OnBehalfOfArgs),
    /// Resource owner password credentials
    Password(PasswordArgs),
    /// Redeem an authorization code
    RedeemCode(RedeemCodeArgs),
    /// Redeem a refresh token
    Refresh(RefreshArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowArg {
    Code,
    Hybrid,
    Implicit,
}

impl From<FlowArg> for AuthorizeFlow {
    fn from(flow: FlowArg) -> Self {
        match flow {
            FlowArg::Code => AuthorizeFlow::AuthorizationCode,
            FlowArg::Hybrid => AuthorizeFlow::Hybrid,
            FlowArg::Implicit => AuthorizeFlow::Implicit,
        }
    }
}

/// Confidential-client credentials accepted by several grants.
#[derive(Args, Debug, Clone, Default)]
pub struct ClientAuthArgs {
    /// Client secret (falls back to ENTRA_CLIENT_SECRET)
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Signed client assertion (JWT)
    #[arg(long)]
    pub client_assertion: Option<String>,
}

#[derive(Args, Debug)]
pub struct AuthorizeUrlArgs {
    #[arg(long, value_enum, default_value = "code")]
    pub flow: FlowArg,
    #[arg(long)]
    pub scope: Option<String>,
    #[arg(long)]
    pub redirect_uri: Option<String>,
    #[arg(long)]
    pub response_type: Option<String>,
    #[arg(long)]
    pub response_mode: Option<String>,
    /// Random value generated when omitted
    #[arg(long)]
    pub state: Option<String>,
    /// Random value generated when the response type asks for an id_token
    #[arg(long)]
    pub nonce: Option<String>,
    /// Generate a PKCE pair and print the verifier
    #[arg(long, conflicts_with = "code_challenge")]
    pub pkce: bool,
    #[arg(long)]
    pub code_challenge: Option<String>,
    #[arg(long, requires = "code_challenge")]
    pub code_challenge_method: Option<String>,
    #[arg(long)]
    pub prompt: Option<String>,
    #[arg(long)]
    pub login_hint: Option<String>,
    #[arg(long)]
    pub domain_hint: Option<String>,
}

#[derive(Args, Debug)]
pub struct ClientCredentialsArgs {
    #[arg(long)]
    pub scope: Option<String>,
    #[arg(long)]
    pub client_secret: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeviceCodeArgs {
    #[arg(long)]
    pub scope: Option<String>,
}

#[derive(Args, Debug)]
pub struct OnBehalfOfArgs {
    /// Incoming access token
    #[arg(long)]
    pub assertion: String,
    #[arg(long)]
    pub scope: Option<String>,
    #[command(flatten)]
    pub client_auth: ClientAuthArgs,
    #[arg(long)]
    pub code_verifier: Option<String>,
    #[arg(long)]
    pub requested_token_type: Option<String>,
}

#[derive(Args, Debug)]
pub struct PasswordArgs {
    #[arg(long)]
    pub username: String,
    /// Read from ENTRA_PASSWORD when omitted
    #[arg(long, env = "ENTRA_PASSWORD", hide_env_values = true)]
    pub password: String,
    #[arg(long)]
    pub scope: Option<String>,
    #[command(flatten)]
    pub client_auth: ClientAuthArgs,
}

#[derive(Args, Debug)]
pub struct RedeemCodeArgs {
    #[arg(long)]
    pub code: String,
    #[arg(long)]
    pub redirect_uri: Option<String>,
    #[command(flatten)]
    pub client_auth: ClientAuthArgs,
    #[arg(long)]
    pub code_verifier: Option<String>,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    #[arg(long)]
    pub refresh_token: String,
    #[arg(long)]
    pub client_secret: Option<String>,
    #[arg(long)]
    pub scope: Option<String>,
}
