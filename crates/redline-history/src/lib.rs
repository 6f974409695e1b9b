//! # redline-history
//!
//! Undo/redo over an immutable JSON document.
//!
//! [`DocumentHistory`] stores a baseline snapshot plus a bounded list of
//! reversible [`Delta`](redline_core::Delta)s. Old deltas are folded into
//! the baseline once the list outgrows its limit, so memory stays bounded
//! no matter how long a session runs.
//!
//! ## Crate Position
//!
//! Depends on: redline-core.
//! Depended on by: redline-runtime.

#![deny(unsafe_code)]

pub mod errors;
pub mod history;

pub use errors::HistoryError;
pub use history::{DEFAULT_LIMIT, DocumentHistory};
