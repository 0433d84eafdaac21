//! Shared HTTP client, form bodies and response capture.

pub mod diagnostics;

pub use diagnostics::ResponseSnapshot;

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use tracing::warn;

use crate::error::Result;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        build_or_default(
            reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .pool_max_idle_per_host(4),
        )
    })
}

fn build_or_default(builder: reqwest::ClientBuilder) -> reqwest::Client {
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "http client setup failed, using defaults without request timeout");
        reqwest::Client::new()
    })
}

/// Ordered `application/x-www-form-urlencoded` body.
///
/// `Debug` lists parameter names only; values may be secrets.
#[derive(Clone, Default)]
pub struct FormParams {
    pairs: Vec<(&'static str, String)>,
}

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.pairs.push((name, value.into()));
        self
    }

    pub fn push_opt(&mut self, name: &'static str, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.push(name, value);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.pairs.iter().map(|(name, _)| *name).collect()
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }
}

impl fmt::Debug for FormParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormParams")
            .field("names", &self.names())
            .finish()
    }
}

/// POST a form body and capture the full response, whatever its status.
pub(crate) async fn post_form(
    client: &reqwest::Client,
    url: Url,
    form: &FormParams,
) -> Result<ResponseSnapshot> {
    let response = client
        .post(url)
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
        .form(form.pairs())
        .send()
        .await?;
    ResponseSnapshot::capture(response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_client_setup_falls_back_to_default_client() {
        // rustls has no protocol version at or below TLS 1.1
        let builder = reqwest::Client::builder().max_tls_version(reqwest::tls::Version::TLS_1_1);
        let client = build_or_default(builder);
        assert!(client.post("https://login.microsoftonline.com/").build().is_ok());
    }

    #[test]
    fn shared_client_is_built_once() {
        assert!(std::ptr::eq(shared_client(), shared_client()));
    }

    #[test]
    fn form_params_keep_insertion_order_and_skip_none() {
        let mut form = FormParams::new();
        form.push("grant_type", "refresh_token")
            .push("client_id", "c")
            .push_opt("scope", None::<String>)
            .push_opt("refresh_token", Some("r"));
        assert_eq!(form.names(), vec!["grant_type", "client_id", "refresh_token"]);
        assert_eq!(form.get("refresh_token"), Some("r"));
        assert!(!form.contains("scope"));
    }

    #[test]
    fn form_params_debug_omits_values() {
        let mut form = FormParams::new();
        form.push("password", "hunter2");
        let rendered = format!("{form:?}");
        assert!(rendered.contains("password"));
        assert!(!rendered.contains("hunter2"));
    }
}
