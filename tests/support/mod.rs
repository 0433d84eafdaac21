#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use entra_flows::auth::{DeviceFlowEvent, DeviceFlowEventSink, TokenClient};
use entra_flows::config::Authority;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TENANT: &str = "contoso";
pub const TOKEN_PATH: &str = "/contoso/oauth2/v2.0/token";
pub const DEVICE_CODE_PATH: &str = "/contoso/oauth2/v2.0/devicecode";

/// Client pointed at the mock server.
///
/// No request timeout and no idle pool, so paused-clock tests only ever see
/// the flow's own timers.
pub fn client(server: &MockServer) -> TokenClient {
    let http = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .expect("test http client");
    TokenClient::new()
        .with_authority(Authority::new(server.uri()))
        .with_http_client(http)
}

pub fn token_body() -> Value {
    json!({
        "token_type": "Bearer",
        "scope": "openid profile User.Read",
        "expires_in": 3599,
        "access_token": "A",
        "refresh_token": "R",
        "id_token": "I"
    })
}

pub fn oauth_error(code: &str, description: &str) -> Value {
    json!({
        "error": code,
        "error_description": description,
        "error_codes": [70016],
        "trace_id": "trace-1",
        "correlation_id": "corr-1"
    })
}

/// Records every event emitted by a flow.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<DeviceFlowEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> DeviceFlowEventSink {
        let events = self.events.clone();
        Arc::new(move |event: DeviceFlowEvent| {
            events.lock().expect("event log poisoned").push(event)
        })
    }

    pub fn events(&self) -> Vec<DeviceFlowEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    /// Intervals of every `Waiting` event, in order.
    pub fn waits(&self) -> Vec<(u64, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DeviceFlowEvent::Waiting {
                    interval,
                    slowed_down,
                } => Some((interval.as_secs(), slowed_down)),
                _ => None,
            })
            .collect()
    }
}
