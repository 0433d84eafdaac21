//! Handlers behind each CLI subcommand.

use std::process::ExitCode;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use super::{
    AuthorizeUrlArgs, ClientAuthArgs, ClientCredentialsArgs, DeviceCodeArgs, GlobalArgs,
    OnBehalfOfArgs, PasswordArgs, RedeemCodeArgs, RefreshArgs,
};
use crate::auth::{
    random_nonce, random_state, AuthorizationCodeRequest, AuthorizeRequest, ClientAuth,
    ClientCredentialsRequest, DeviceCodeFlow, DeviceCodeOutcome, DeviceCodeRequest,
    DeviceFlowEvent, OnBehalfOfRequest, PasswordRequest, PkcePair, RefreshTokenRequest,
    TokenClient, TokenGrant, TokenResponse, TokenResult,
};
use crate::config::FlowConfig;
use crate::error::Result;

/// Resolved settings for one invocation: env first, then flags.
struct Context {
    config: FlowConfig,
    client: TokenClient,
    show_response: bool,
}

impl Context {
    fn new(global: &GlobalArgs) -> Self {
        let config = global.apply(FlowConfig::from_env());
        let client = TokenClient::new().with_authority(config.authority.clone());
        Self {
            config,
            client,
            show_response: global.show_response,
        }
    }

    fn scope<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str> {
        match explicit {
            Some(scope) => Ok(scope),
            None => self.config.require_scope(),
        }
    }

    fn client_secret(&self, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(secret) => Ok(secret.to_string()),
            None => Ok(self.config.require_client_secret()?.expose_secret().clone()),
        }
    }

    /// Flags win; otherwise a configured secret is used if there is one.
    fn client_auth(&self, args: &ClientAuthArgs) -> ClientAuth {
        let mut auth = ClientAuth::public();
        let secret = args.client_secret.clone().or_else(|| {
            self.config
                .client_secret
                .as_ref()
                .map(|s| s.expose_secret().clone())
        });
        if let Some(secret) = secret {
            auth = auth.with_secret(secret);
        }
        if let Some(assertion) = &args.client_assertion {
            auth = auth.with_assertion(assertion);
        }
        auth
    }

    async fn exchange(&self, grant: TokenGrant) -> Result<ExitCode> {
        let response = self.client.exchange_with_response(&grant).await?;
        self.print_tokens(&response)?;
        Ok(ExitCode::SUCCESS)
    }

    fn print_tokens(&self, response: &TokenResponse) -> Result<()> {
        if self.show_response {
            println!("{}", response.response.render());
            println!();
        }
        print_token_json(&response.tokens)
    }
}

fn print_token_json(tokens: &TokenResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(tokens)?);
    Ok(())
}

pub fn authorize_url(global: &GlobalArgs, args: AuthorizeUrlArgs) -> Result<ExitCode> {
    let ctx = Context::new(global);
    let mut request = AuthorizeRequest::builder()
        .flow(args.flow.into())
        .tenant_id(ctx.config.require_tenant_id()?)
        .client_id(ctx.config.require_client_id()?)
        .scope(ctx.scope(args.scope.as_deref())?)
        .maybe_redirect_uri(args.redirect_uri.or_else(|| ctx.config.redirect_uri.clone()))
        .maybe_response_type(args.response_type)
        .maybe_response_mode(args.response_mode)
        .state(args.state.unwrap_or_else(random_state))
        .maybe_nonce(args.nonce)
        .maybe_code_challenge(args.code_challenge)
        .maybe_code_challenge_method(args.code_challenge_method)
        .maybe_prompt(args.prompt)
        .maybe_login_hint(args.login_hint)
        .maybe_domain_hint(args.domain_hint)
        .build();

    let wants_id_token = request
        .response_type()
        .split_whitespace()
        .any(|part| part == "id_token");
    if wants_id_token && request.nonce.is_none() {
        request.nonce = Some(random_nonce());
    }
    if args.pkce {
        let pkce = PkcePair::generate();
        eprintln!("code_verifier: {}", pkce.verifier());
        request = request.with_pkce(&pkce);
    }

    let url = ctx.config.authority.authorize_url(&request)?;
    println!("{url}");
    Ok(ExitCode::SUCCESS)
}

pub async fn client_credentials(
    global: &GlobalArgs,
    args: ClientCredentialsArgs,
) -> Result<ExitCode> {
    let ctx = Context::new(global);
    let request = ClientCredentialsRequest::new(
        ctx.config.require_tenant_id()?,
        ctx.config.require_client_id()?,
        ctx.client_secret(args.client_secret.as_deref())?,
        ctx.scope(args.scope.as_deref())?,
    );
    ctx.exchange(request.into()).await
}

pub async fn device_code(global: &GlobalArgs, args: DeviceCodeArgs) -> Result<ExitCode> {
    let ctx = Context::new(global);
    let request = DeviceCodeRequest::new(
        ctx.config.require_tenant_id()?,
        ctx.config.require_client_id()?,
        ctx.scope(args.scope.as_deref())?,
    );

    let flow = DeviceCodeFlow::new(ctx.client.clone()).with_event_sink(Arc::new(
        |event: DeviceFlowEvent| match event {
            DeviceFlowEvent::CodeIssued(session) if !session.message.is_empty() => {
                eprintln!("{}", session.message);
            }
            DeviceFlowEvent::CodeIssued(session) => {
                eprintln!(
                    "Visit {} and enter code {}",
                    session.verification_uri, session.user_code
                );
            }
            DeviceFlowEvent::Waiting {
                interval,
                slowed_down: true,
            } => {
                eprintln!("Polling slowed to every {}s", interval.as_secs());
            }
            _ => {}
        },
    ));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = flow.run(&request, &cancel).await?;
    match outcome {
        DeviceCodeOutcome::Succeeded(response) => {
            ctx.print_tokens(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        other => {
            eprintln!("Device code flow ended: {}", other.state());
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn on_behalf_of(global: &GlobalArgs, args: OnBehalfOfArgs) -> Result<ExitCode> {
    let ctx = Context::new(global);
    let mut request = OnBehalfOfRequest::new(
        ctx.config.require_tenant_id()?,
        ctx.config.require_client_id()?,
        args.assertion,
        ctx.scope(args.scope.as_deref())?,
    )
    .with_client_auth(ctx.client_auth(&args.client_auth));
    if let Some(verifier) = args.code_verifier {
        request = request.with_code_verifier(verifier);
    }
    if let Some(token_type) = args.requested_token_type {
        request = request.with_requested_token_type(token_type);
    }
    ctx.exchange(request.into()).await
}

pub async fn password(global: &GlobalArgs, args: PasswordArgs) -> Result<ExitCode> {
    let ctx = Context::new(global);
    let request = PasswordRequest::new(
        ctx.config.require_tenant_id()?,
        ctx.config.require_client_id()?,
        ctx.scope(args.scope.as_deref())?,
        args.username,
        args.password,
    )
    .with_client_auth(ctx.client_auth(&args.client_auth));
    ctx.exchange(request.into()).await
}

pub async fn redeem_code(global: &GlobalArgs, args: RedeemCodeArgs) -> Result<ExitCode> {
    let ctx = Context::new(global);
    let redirect_uri = match args.redirect_uri {
        Some(uri) => uri,
        None => ctx.config.require_redirect_uri()?.to_string(),
    };
    let mut request = AuthorizationCodeRequest::new(
        ctx.config.require_tenant_id()?,
        ctx.config.require_client_id()?,
        args.code,
        redirect_uri,
    )
    .with_client_auth(ctx.client_auth(&args.client_auth));
    if let Some(verifier) = args.code_verifier {
        request = request.with_code_verifier(verifier);
    }
    ctx.exchange(request.into()).await
}

pub async fn refresh(global: &GlobalArgs, args: RefreshArgs) -> Result<ExitCode> {
    let ctx = Context::new(global);
    let mut request = RefreshTokenRequest::new(
        ctx.config.require_tenant_id()?,
        ctx.config.require_client_id()?,
        ctx.client_secret(args.client_secret.as_deref())?,
        args.refresh_token,
    );
    if let Some(scope) = args.scope {
        request = request.with_scope(scope);
    }
    ctx.exchange(request.into()).await
}
