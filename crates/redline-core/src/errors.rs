//! Error types for document values and delta application.

use thiserror::Error;

use crate::delta::PathSegment;

/// Errors raised while applying or reverting a [`Delta`](crate::delta::Delta).
///
/// A delta produced by [`Delta::diff`](crate::delta::Delta::diff) always
/// applies cleanly to the document it was diffed against. These errors mean
/// the target document diverged from the delta's source state.
#[derive(Debug, Error, PartialEq)]
pub enum DeltaError {
    /// A path segment did not resolve inside the target document.
    #[error("path not found: {}", format_path(.path))]
    PathNotFound {
        /// Path up to and including the segment that failed.
        path: Vec<PathSegment>,
    },

    /// A path segment addressed the wrong container kind.
    #[error("type mismatch at {}: expected {expected}", format_path(.path))]
    TypeMismatch {
        /// Path of the offending container.
        path: Vec<PathSegment>,
        /// Container kind the operation needed.
        expected: &'static str,
    },

    /// The value at a path differs from what the operation recorded.
    #[error("conflict at {}: {reason}", format_path(.path))]
    Conflict {
        /// Path of the conflicting value.
        path: Vec<PathSegment>,
        /// What differed.
        reason: String,
    },
}

impl DeltaError {
    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::PathNotFound { .. } => "path_not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::Conflict { .. } => "conflict",
        }
    }
}

/// Errors raised while loading or exporting a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Reading or writing the document file failed.
    #[error("document io error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON.
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The file does not look like a JSON document.
    #[error("unsupported document file: {0} (expected a .json file)")]
    UnsupportedFile(String),
}

impl DocumentError {
    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::UnsupportedFile(_) => "unsupported_file",
        }
    }
}

/// Render a path as a JSON Pointer (`/a/0/b`), `/` for the root.
pub fn format_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().fold(String::new(), |mut out, segment| {
        out.push('/');
        match segment {
            PathSegment::Key(key) => out.push_str(&key.replace('~', "~0").replace('/', "~1")),
            PathSegment::Index(index) => out.push_str(&index.to_string()),
        }
        out
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
