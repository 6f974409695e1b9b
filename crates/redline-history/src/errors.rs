//! History error types.

use redline_core::DeltaError;
use thiserror::Error;

/// A history transition failed. The history is left unchanged.
#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    /// Reverting a recorded delta failed.
    #[error("undo of delta {index} failed: {source}")]
    Undo {
        /// Position of the delta in the history.
        index: usize,
        /// Underlying patch failure.
        #[source]
        source: DeltaError,
    },

    /// Re-applying a recorded delta failed.
    #[error("redo of delta {index} failed: {source}")]
    Redo {
        /// Position of the delta in the history.
        index: usize,
        /// Underlying patch failure.
        #[source]
        source: DeltaError,
    },

    /// Folding the oldest delta into the baseline failed.
    #[error("history compaction failed: {source}")]
    Compaction {
        /// Underlying patch failure.
        #[source]
        source: DeltaError,
    },
}

impl HistoryError {
    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::Compaction { .. } => "compaction",
        }
    }

    /// The patch failure behind this error.
    pub fn delta_error(&self) -> &DeltaError {
        match self {
            Self::Undo { source, .. } | Self::Redo { source, .. } | Self::Compaction { source } => {
                source
            }
        }
    }
}
