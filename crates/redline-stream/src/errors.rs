//! Event parse errors.
//!
//! A [`ParseError`] never ends a stream. The router logs it and moves on to
//! the next line.

use thiserror::Error;

/// Why a single stream line produced no event.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The line is not valid JSON.
    #[error("malformed event line: {reason}")]
    Malformed {
        /// The offending line, trimmed.
        line: String,
        /// Decoder message.
        reason: String,
    },

    /// A known event type is missing a required field or has the wrong shape.
    #[error("invalid {event_type} event: {reason}")]
    InvalidEvent {
        /// Wire discriminator of the event.
        event_type: String,
        /// What was wrong with it.
        reason: String,
        /// The offending line, trimmed.
        line: String,
    },

    /// A `tool_result` carried nested text that is not a JSON document.
    #[error("tool_result payload is not a JSON document: {reason}")]
    InvalidToolResult {
        /// Decoder message for the nested text.
        reason: String,
        /// The offending line, trimmed.
        line: String,
    },
}

impl ParseError {
    /// The line that failed to parse.
    pub fn line(&self) -> &str {
        match self {
            Self::Malformed { line, .. }
            | Self::InvalidEvent { line, .. }
            | Self::InvalidToolResult { line, .. } => line,
        }
    }

    /// Error category for logging and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::InvalidEvent { .. } => "invalid_event",
            Self::InvalidToolResult { .. } => "invalid_tool_result",
        }
    }
}
