//! entra-flows: client-side OAuth2 flows for the Microsoft identity platform.
//!
//! Builds authorize URLs for the interactive flows, redeems every token grant
//! the v2.0 endpoint supports through one client, and drives the device-code
//! polling loop with cancellation.
//!
//! # Quick Start
//!
//! ```no_run
//! use entra_flows::prelude::*;
//!
//! # async fn example() -> entra_flows::error::Result<()> {
//! let config = FlowConfig::from_env();
//! let client = TokenClient::new().with_authority(config.authority.clone());
//! let request = OnBehalfOfRequest::new(
//!     config.require_tenant_id()?,
//!     config.require_client_id()?,
//!     "incoming-access-token",
//!     "https://graph.microsoft.com/.default",
//! )
//! .with_client_auth(ClientAuth::secret("client-secret"));
//! let tokens = client.on_behalf_of(request).await?;
//! println!("{tokens:?}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
