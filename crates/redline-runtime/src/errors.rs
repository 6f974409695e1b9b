//! Runtime error types.

use redline_core::DocumentError;
use redline_history::HistoryError;

/// Errors talking to the agent backend.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response stream broke off mid-body.
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

impl TransportError {
    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(e) if e.is_connect() => "connect",
            Self::Http(e) if e.is_timeout() => "timeout",
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::Interrupted(_) => "interrupted",
        }
    }
}

/// Errors surfaced by session commands.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Loading or exporting a document failed.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// An undo or redo step could not be applied.
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// The agent backend could not be reached.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The command needs a loaded document.
    #[error("No document loaded")]
    NoDocument,

    /// A request task panicked or was aborted.
    #[error("Request task failed: {0}")]
    Task(String),
}

impl RuntimeError {
    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Document(_) => "document",
            Self::History(_) => "history",
            Self::Transport(_) => "transport",
            Self::NoDocument => "no_document",
            Self::Task(_) => "task",
        }
    }
}
