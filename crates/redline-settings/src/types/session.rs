//! History, stream, and logging settings.

use serde::{Deserialize, Serialize};

/// Undo history settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistorySettings {
    /// Deltas retained before the oldest is folded into the baseline.
    pub max_deltas: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_deltas: 20 }
    }
}

/// Response stream decoding settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Emit an unterminated final fragment as a last line when the stream
    /// ends cleanly. When `false` the fragment is dropped.
    pub flush_trailing_fragment: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            flush_trailing_fragment: true,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable compact lines.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (`RUST_LOG` wins when set).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}
