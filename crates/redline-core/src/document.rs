//! Immutable document values and their file metadata.
//!
//! A [`Document`] wraps its JSON tree in an `Arc`. Cloning is a pointer copy,
//! and no API hands out `&mut` access to the tree, so a snapshot taken by a
//! renderer can never change underneath it. Edits go through
//! [`Document::to_value`] (an owned deep copy) and come back via
//! [`Document::new`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DocumentError;

/// An immutable, cheaply cloned JSON document.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Arc<Value>);

impl Document {
    /// Wrap a JSON value.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// The empty (`null`) document.
    pub fn null() -> Self {
        Self::default()
    }

    /// Parse a document from raw bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, DocumentError> {
        Ok(Self::new(serde_json::from_slice(raw)?))
    }

    /// Parse a document from text.
    pub fn from_json_str(raw: &str) -> Result<Self, DocumentError> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    /// Borrow the underlying JSON tree.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Deep copy of the underlying JSON tree, free to mutate.
    pub fn to_value(&self) -> Value {
        Value::clone(&self.0)
    }

    /// Whether this is the `null` document.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Whether two handles share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Pretty-printed JSON (two-space indent, no trailing newline).
    pub fn to_pretty_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self.value())?)
    }

    /// Write the pretty-printed document to `path`.
    pub fn export(&self, path: &Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_pretty_json()?)?;
        Ok(())
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Document").field(self.value()).finish()
    }
}

/// File metadata for a loaded document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// File name shown to the user and reused on export.
    pub name: String,
    /// Size of the raw file in bytes.
    pub size: u64,
    /// Last modification time, when the source knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl DocumentInfo {
    /// Metadata for an in-memory document with no backing file.
    pub fn untitled(size: u64) -> Self {
        Self {
            name: "untitled.json".to_string(),
            size,
            last_modified: None,
        }
    }

    /// Human-readable size (`512 bytes`, `1.5 KB`, `2.0 MB`).
    pub fn display_size(&self) -> String {
        format_size(self.size)
    }
}

/// Format a byte count with 1024-based units.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} bytes")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Read and parse a `.json` document file.
///
/// Rejects files without a `.json` extension before reading them.
pub fn load_file(path: &Path) -> Result<(Document, DocumentInfo), DocumentError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(DocumentError::UnsupportedFile(name));
    }

    let raw = std::fs::read(path)?;
    let document = Document::from_slice(&raw)?;
    let last_modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    tracing::debug!(?path, size = raw.len(), "document file loaded");
    Ok((
        document,
        DocumentInfo {
            name,
            size: raw.len() as u64,
            last_modified,
        },
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
