//! Agent backend endpoint settings.

use serde::{Deserialize, Serialize};

/// Where the agent backend lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Backend origin, without a trailing slash.
    pub base_url: String,
    /// Handshake endpoint called once at startup.
    pub setup_path: String,
    /// Prompt endpoint; its response body is the event stream.
    pub message_path: String,
    /// Out-of-band stop signal endpoint.
    pub cancel_path: String,
    /// Conversation reset endpoint.
    pub clear_path: String,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Whole-request timeout for the control endpoints in milliseconds.
    ///
    /// The streaming prompt request is not bounded by this value.
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001".to_string(),
            setup_path: "/setup/".to_string(),
            message_path: "/message/".to_string(),
            cancel_path: "/cancel/".to_string(),
            clear_path: "/clear/".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerSettings {
    /// Join the base URL with an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
