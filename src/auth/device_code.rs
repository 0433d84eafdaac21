//! Device authorization grant: request a user code, then poll for tokens.
//!
//! ```text
//! RequestingCode -> Polling -> Succeeded | Declined | BadCode | Expired
//!                              | ProviderError | TransportError | Cancelled
//! ```
//!
//! `authorization_pending` and `slow_down` keep the session polling; every
//! other outcome is terminal. Waits are cancellable timers, so many flows can
//! run on one runtime.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use strum::Display;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::client::{parse_token_response, provider_error, TokenClient};
use crate::auth::grant::{DeviceCodeTokenRequest, TokenGrant};
use crate::auth::token::{OAuthError, TokenResponse, TokenResult};
use crate::error::{FlowError, Result};
use crate::http::{post_form, FormParams};

/// Seconds added to the poll interval on every `slow_down`.
pub const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Interval used when the provider omits one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Floor for a provider-supplied interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Input of the device-code request.
#[derive(Debug, Clone)]
pub struct DeviceCodeRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub scope: String,
}

impl DeviceCodeRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            scope: scope.into(),
        }
    }
}

/// Device-code session for one flow invocation.
///
/// `interval` is the current poll interval; only a `slow_down` response
/// changes it.
#[derive(Debug, Clone)]
pub struct DeviceCodeSession {
    pub tenant_id: String,
    pub client_id: String,
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub message: String,
    pub expires_in: Duration,
    pub interval: Duration,
    pub deadline: Instant,
}

impl DeviceCodeSession {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Apply a `slow_down`: at least the provider's interval, plus the step.
    fn slow_down(&mut self, provider_interval: Option<Duration>) {
        let base = provider_interval.map_or(self.interval, |p| p.max(self.interval));
        self.interval = base.saturating_add(SLOW_DOWN_STEP);
    }

    fn token_grant(&self) -> TokenGrant {
        DeviceCodeTokenRequest::new(&self.tenant_id, &self.client_id, &self.device_code).into()
    }
}

/// Result of a single poll of the token endpoint.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    Pending,
    SlowDown { interval: Duration },
    Authorized(TokenResponse),
    Declined,
    BadVerificationCode,
    Expired,
}

/// Terminal outcome of a device flow that reached a named provider state.
///
/// Provider errors, transport failures and cancellation are returned as
/// [`FlowError`] instead.
#[derive(Debug, Clone)]
pub enum DeviceCodeOutcome {
    Succeeded(TokenResponse),
    Declined,
    BadVerificationCode,
    Expired,
}

impl DeviceCodeOutcome {
    pub fn state(&self) -> DeviceFlowState {
        match self {
            Self::Succeeded(_) => DeviceFlowState::Succeeded,
            Self::Declined => DeviceFlowState::Declined,
            Self::BadVerificationCode => DeviceFlowState::BadCode,
            Self::Expired => DeviceFlowState::Expired,
        }
    }

    pub fn tokens(&self) -> Option<&TokenResult> {
        match self {
            Self::Succeeded(response) => Some(&response.tokens),
            _ => None,
        }
    }

    /// Tokens on success, an empty result for every other outcome.
    pub fn into_tokens(self) -> TokenResult {
        match self {
            Self::Succeeded(response) => response.tokens,
            _ => TokenResult::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceFlowState {
    RequestingCode,
    Polling,
    Succeeded,
    Declined,
    BadCode,
    Expired,
    ProviderError,
    TransportError,
    Cancelled,
}

impl DeviceFlowState {
    /// Terminal state of a finished flow.
    pub fn of(result: &Result<DeviceCodeOutcome>) -> Self {
        match result {
            Ok(outcome) => outcome.state(),
            Err(FlowError::Cancelled) => Self::Cancelled,
            Err(FlowError::OAuth(_)) => Self::ProviderError,
            Err(_) => Self::TransportError,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::RequestingCode | Self::Polling)
    }
}

/// Progress notifications; the flow itself never prints.
#[derive(Debug, Clone)]
pub enum DeviceFlowEvent {
    /// Show `message` (or the URI and user code) to the user.
    CodeIssued(DeviceCodeSession),
    Waiting { interval: Duration, slowed_down: bool },
    Finished { state: DeviceFlowState },
}

pub type DeviceFlowEventSink = Arc<dyn Fn(DeviceFlowEvent) + Send + Sync>;

/// Drives the device authorization grant.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use entra_flows::auth::{DeviceCodeFlow, DeviceCodeRequest, DeviceFlowEvent, TokenClient};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> entra_flows::error::Result<()> {
/// let sink = Arc::new(|event: DeviceFlowEvent| {
///     if let DeviceFlowEvent::CodeIssued(session) = event {
///         println!("{}", session.message);
///     }
/// });
/// let flow = DeviceCodeFlow::new(TokenClient::new()).with_event_sink(sink);
/// let request = DeviceCodeRequest::new("common", "my-app", "openid profile User.Read");
/// let outcome = flow.run(&request, &CancellationToken::new()).await?;
/// println!("{}", outcome.state());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DeviceCodeFlow {
    client: TokenClient,
    event_sink: Option<DeviceFlowEventSink>,
}

impl fmt::Debug for DeviceCodeFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCodeFlow")
            .field("client", &self.client)
            .field("event_sink", &self.event_sink.as_ref().map(|_| ".."))
            .finish()
    }
}

impl DeviceCodeFlow {
    pub fn new(client: TokenClient) -> Self {
        Self {
            client,
            event_sink: None,
        }
    }

    pub fn with_event_sink(mut self, sink: DeviceFlowEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Request a device code and user code. Any failure is terminal.
    pub async fn request_code(&self, request: &DeviceCodeRequest) -> Result<DeviceCodeSession> {
        let url = self.client.authority().device_code_url(&request.tenant_id)?;
        let mut form = FormParams::new();
        form.push("client_id", request.client_id.as_str())
            .push("scope", request.scope.as_str());
        debug!(tenant = %request.tenant_id, "requesting device code");

        let response = post_form(self.client.http(), url, &form).await?;
        match response.status {
            200 => {}
            400 => return Err(provider_error(&response)),
            status => {
                return Err(FlowError::UnexpectedStatus {
                    status,
                    body: response.body,
                })
            }
        }
        let payload: DeviceCodeResponse = serde_json::from_str(&response.body)
            .map_err(|e| FlowError::Decode(format!("device code response: {e}")))?;
        let expires_in = Duration::from_secs(payload.expires_in);
        let session = DeviceCodeSession {
            tenant_id: request.tenant_id.clone(),
            client_id: request.client_id.clone(),
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri: payload.verification_uri,
            message: payload.message.unwrap_or_default(),
            expires_in,
            interval: poll_interval(payload.interval),
            deadline: session_deadline(expires_in)?,
        };
        info!(
            verification_uri = %session.verification_uri,
            expires_in = payload.expires_in,
            interval = session.interval.as_secs(),
            "device code issued"
        );
        self.emit(DeviceFlowEvent::CodeIssued(session.clone()));
        Ok(session)
    }

    /// Poll the token endpoint once.
    ///
    /// A session past its deadline yields `Expired` without a request.
    pub async fn poll_once(&self, session: &mut DeviceCodeSession) -> Result<DeviceCodePoll> {
        if session.is_expired() {
            return Ok(DeviceCodePoll::Expired);
        }
        let grant = session.token_grant();
        let url = self.client.authority().token_url(grant.tenant_id())?;
        let form = grant.form()?;
        let response = post_form(self.client.http(), url, &form).await?;

        match response.status {
            200 => {
                let tokens = parse_token_response(&response)?;
                Ok(DeviceCodePoll::Authorized(TokenResponse { tokens, response }))
            }
            400 => {
                let Ok(error) = serde_json::from_str::<OAuthError>(&response.body) else {
                    return Err(provider_error(&response));
                };
                match error.code.as_str() {
                    "authorization_pending" => Ok(DeviceCodePoll::Pending),
                    "slow_down" => {
                        session.slow_down(provider_interval(&response.body));
                        Ok(DeviceCodePoll::SlowDown {
                            interval: session.interval,
                        })
                    }
                    "authorization_declined" => Ok(DeviceCodePoll::Declined),
                    "bad_verification_code" => Ok(DeviceCodePoll::BadVerificationCode),
                    "expired_token" => Ok(DeviceCodePoll::Expired),
                    _ => {
                        warn!(code = %error.code, "device code polling failed");
                        Err(FlowError::OAuth(error))
                    }
                }
            }
            status => Err(FlowError::UnexpectedStatus {
                status,
                body: response.body,
            }),
        }
    }

    /// Poll until a terminal state, waiting `interval` between attempts.
    ///
    /// The first poll is immediate. `cancel` is honored before and during
    /// every request and every wait.
    pub async fn wait_for_token(
        &self,
        mut session: DeviceCodeSession,
        cancel: &CancellationToken,
    ) -> Result<DeviceCodeOutcome> {
        let result = self.poll_loop(&mut session, cancel).await;
        let state = DeviceFlowState::of(&result);
        info!(%state, "device code flow finished");
        self.emit(DeviceFlowEvent::Finished { state });
        result
    }

    /// Request a code, then poll until a terminal state.
    pub async fn run(
        &self,
        request: &DeviceCodeRequest,
        cancel: &CancellationToken,
    ) -> Result<DeviceCodeOutcome> {
        let requested = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FlowError::Cancelled),
            session = self.request_code(request) => session,
        };
        match requested {
            Ok(session) => self.wait_for_token(session, cancel).await,
            Err(error) => {
                let result = Err(error);
                self.emit(DeviceFlowEvent::Finished {
                    state: DeviceFlowState::of(&result),
                });
                result
            }
        }
    }

    async fn poll_loop(
        &self,
        session: &mut DeviceCodeSession,
        cancel: &CancellationToken,
    ) -> Result<DeviceCodeOutcome> {
        loop {
            let poll = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FlowError::Cancelled),
                poll = self.poll_once(session) => poll?,
            };
            let (interval, slowed_down) = match poll {
                DeviceCodePoll::Authorized(response) => {
                    return Ok(DeviceCodeOutcome::Succeeded(response))
                }
                DeviceCodePoll::Declined => return Ok(DeviceCodeOutcome::Declined),
                DeviceCodePoll::BadVerificationCode => {
                    return Ok(DeviceCodeOutcome::BadVerificationCode)
                }
                DeviceCodePoll::Expired => return Ok(DeviceCodeOutcome::Expired),
                DeviceCodePoll::Pending => {
                    debug!(interval = session.interval.as_secs(), "authorization pending");
                    (session.interval, false)
                }
                DeviceCodePoll::SlowDown { interval } => {
                    info!(interval = interval.as_secs(), "provider asked to slow down");
                    (interval, true)
                }
            };
            self.emit(DeviceFlowEvent::Waiting {
                interval,
                slowed_down,
            });
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FlowError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn emit(&self, event: DeviceFlowEvent) {
        if let Some(sink) = &self.event_sink {
            sink(event);
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: Option<u64>,
    message: Option<String>,
}

fn poll_interval(secs: Option<u64>) -> Duration {
    secs.map_or(DEFAULT_POLL_INTERVAL, |secs| {
        Duration::from_secs(secs).max(MIN_POLL_INTERVAL)
    })
}

fn session_deadline(expires_in: Duration) -> Result<Instant> {
    Instant::now().checked_add(expires_in).ok_or_else(|| {
        FlowError::Decode(format!(
            "device code expires_in {}s is out of range",
            expires_in.as_secs()
        ))
    })
}

fn provider_interval(body: &str) -> Option<Duration> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("interval")?
        .as_u64()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(interval_secs: u64) -> DeviceCodeSession {
        DeviceCodeSession {
            tenant_id: "t".to_string(),
            client_id: "c".to_string(),
            device_code: "dc".to_string(),
            user_code: "ABCD-EFGH".to_string(),
            verification_uri: "https://microsoft.com/devicelogin".to_string(),
            message: String::new(),
            expires_in: Duration::from_secs(900),
            interval: Duration::from_secs(interval_secs),
            deadline: Instant::now() + Duration::from_secs(900),
        }
    }

    #[test]
    fn slow_down_adds_step_cumulatively() {
        let mut s = session(5);
        s.slow_down(None);
        s.slow_down(None);
        assert_eq!(s.interval, Duration::from_secs(15));
    }

    #[test]
    fn slow_down_respects_larger_provider_interval() {
        let mut s = session(5);
        s.slow_down(Some(Duration::from_secs(20)));
        assert_eq!(s.interval, Duration::from_secs(25));
        s.slow_down(Some(Duration::from_secs(1)));
        assert_eq!(s.interval, Duration::from_secs(30));
    }

    #[test]
    fn slow_down_saturates_on_huge_provider_interval() {
        let mut s = session(5);
        s.slow_down(Some(Duration::from_secs(u64::MAX)));
        assert_eq!(s.interval, Duration::MAX);
        s.slow_down(None);
        assert_eq!(s.interval, Duration::MAX);
    }

    #[test]
    fn out_of_range_expiry_is_a_decode_error() {
        let result = session_deadline(Duration::from_secs(u64::MAX));
        assert!(matches!(result, Err(FlowError::Decode(msg)) if msg.contains("expires_in")));
        assert!(session_deadline(Duration::from_secs(900)).is_ok());
    }

    #[test]
    fn poll_interval_has_a_floor_and_a_default() {
        assert_eq!(poll_interval(Some(0)), MIN_POLL_INTERVAL);
        assert_eq!(poll_interval(Some(7)), Duration::from_secs(7));
        assert_eq!(poll_interval(None), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn provider_interval_reads_optional_field() {
        assert_eq!(
            provider_interval(r#"{"error":"slow_down","interval":12}"#),
            Some(Duration::from_secs(12))
        );
        assert_eq!(provider_interval(r#"{"error":"slow_down"}"#), None);
        assert_eq!(provider_interval("nope"), None);
    }

    #[test]
    fn state_of_maps_errors() {
        assert_eq!(
            DeviceFlowState::of(&Err(FlowError::Cancelled)),
            DeviceFlowState::Cancelled
        );
        assert_eq!(
            DeviceFlowState::of(&Err(FlowError::OAuth(OAuthError::new("invalid_client")))),
            DeviceFlowState::ProviderError
        );
        assert_eq!(
            DeviceFlowState::of(&Err(FlowError::UnexpectedStatus {
                status: 500,
                body: String::new()
            })),
            DeviceFlowState::TransportError
        );
        assert_eq!(
            DeviceFlowState::of(&Ok(DeviceCodeOutcome::Declined)),
            DeviceFlowState::Declined
        );
        assert!(!DeviceFlowState::Polling.is_terminal());
        assert_eq!(DeviceFlowState::BadCode.to_string(), "bad_code");
    }

    #[test]
    fn non_success_outcomes_yield_empty_tokens() {
        assert_eq!(DeviceCodeOutcome::Expired.into_tokens(), TokenResult::default());
        assert!(DeviceCodeOutcome::BadVerificationCode.tokens().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn session_deadline_follows_tokio_clock() {
        let s = session(5);
        assert!(!s.is_expired());
        tokio::time::advance(Duration::from_secs(901)).await;
        assert!(s.is_expired());
        assert_eq!(s.remaining(), Duration::ZERO);
    }
}
