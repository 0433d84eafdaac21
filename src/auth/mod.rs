//! OAuth2 flows against the Microsoft identity platform.

pub mod authorize;
pub mod client;
pub mod device_code;
pub mod grant;
pub mod pkce;
pub mod token;

pub use authorize::{AuthorizeFlow, AuthorizeRequest};
pub use client::TokenClient;
pub use device_code::{
    DeviceCodeFlow, DeviceCodeOutcome, DeviceCodePoll, DeviceCodeRequest, DeviceCodeSession,
    DeviceFlowEvent, DeviceFlowEventSink, DeviceFlowState,
};
pub use grant::{
    AuthorizationCodeRequest, ClientAuth, ClientCredentialsRequest, DeviceCodeTokenRequest,
    GrantType, OnBehalfOfRequest, PasswordRequest, RefreshTokenRequest, TokenGrant,
};
pub use pkce::{random_nonce, random_state, ChallengeMethod, PkcePair};
pub use token::{OAuthError, TokenResponse, TokenResult};
