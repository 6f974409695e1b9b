//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! settings file only needs the fields it changes.

mod server;
mod session;

pub use server::*;
pub use session::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// Loaded from `~/.redline/settings.json` with defaults applied for missing
/// fields. Example:
///
/// ```json
/// {
///   "server": { "baseUrl": "http://10.0.0.5:8001" },
///   "history": { "maxDeltas": 50 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedlineSettings {
    /// Settings schema version.
    pub version: String,
    /// Agent backend endpoints and timeouts.
    pub server: ServerSettings,
    /// Undo history bounds.
    pub history: HistorySettings,
    /// Response stream decoding.
    pub stream: StreamSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for RedlineSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            server: ServerSettings::default(),
            history: HistorySettings::default(),
            stream: StreamSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl RedlineSettings {
    /// Clamp out-of-range values.
    ///
    /// Called automatically during loading. Bad values are corrected with a
    /// warning rather than rejected.
    pub fn validate(&mut self) {
        if self.history.max_deltas == 0 {
            tracing::warn!("history.maxDeltas must be at least 1, using 1");
            self.history.max_deltas = 1;
        }
        if self.server.request_timeout_ms < self.server.connect_timeout_ms {
            tracing::warn!(
                request_timeout_ms = self.server.request_timeout_ms,
                connect_timeout_ms = self.server.connect_timeout_ms,
                "request timeout shorter than connect timeout, raising it"
            );
            self.server.request_timeout_ms = self.server.connect_timeout_ms;
        }
        let trimmed = self.server.base_url.trim_end_matches('/').to_string();
        self.server.base_url = trimmed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = RedlineSettings::default();
        assert_eq!(settings.server.base_url, "http://127.0.0.1:8001");
        assert_eq!(settings.server.message_path, "/message/");
        assert_eq!(settings.history.max_deltas, 20);
        assert!(settings.stream.flush_trailing_fragment);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: RedlineSettings =
            serde_json::from_str(r#"{"history": {"maxDeltas": 5}}"#).unwrap();
        assert_eq!(settings.history.max_deltas, 5);
        assert_eq!(settings.server.cancel_path, "/cancel/");
    }

    #[test]
    fn camel_case_round_trip() {
        let json = serde_json::to_value(RedlineSettings::default()).unwrap();
        assert!(json["server"]["baseUrl"].is_string());
        assert!(json["stream"]["flushTrailingFragment"].is_boolean());
    }

    #[test]
    fn validate_clamps_zero_history() {
        let mut settings = RedlineSettings::default();
        settings.history.max_deltas = 0;
        settings.validate();
        assert_eq!(settings.history.max_deltas, 1);
    }

    #[test]
    fn validate_trims_trailing_slash() {
        let mut settings = RedlineSettings::default();
        settings.server.base_url = "http://host:1//".into();
        settings.validate();
        assert_eq!(settings.server.base_url, "http://host:1");
    }

    #[test]
    fn validate_raises_short_request_timeout() {
        let mut settings = RedlineSettings::default();
        settings.server.connect_timeout_ms = 5_000;
        settings.server.request_timeout_ms = 1_000;
        settings.validate();
        assert_eq!(settings.server.request_timeout_ms, 5_000);
    }
}
