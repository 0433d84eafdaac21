//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthorizationCodeRequest, AuthorizeFlow, AuthorizeRequest, ClientAuth,
    ClientCredentialsRequest, DeviceCodeFlow, DeviceCodeOutcome, DeviceCodeRequest,
    DeviceFlowEvent, DeviceFlowState, OAuthError, OnBehalfOfRequest, PasswordRequest, PkcePair,
    RefreshTokenRequest, TokenClient, TokenGrant, TokenResult,
};
pub use crate::config::{Authority, FlowConfig};
pub use crate::error::{FlowError, Result};
pub use crate::http::ResponseSnapshot;
