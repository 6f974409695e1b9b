//! # redline-core
//!
//! Foundation types shared by every redline crate:
//!
//! - **Documents**: [`document::Document`], an immutable, cheaply cloned JSON
//!   value, plus [`document::DocumentInfo`] file metadata
//! - **Deltas**: [`delta::Delta`], a reversible diff between two documents
//!   with `apply` / `unapply`
//! - **Events**: [`events::AgentEvent`], the typed records decoded from the
//!   agent's NDJSON stream
//! - **Errors**: [`errors::DeltaError`] and [`errors::DocumentError`]
//! - **Logging**: [`logging::init_subscriber`]
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other redline crates.

#![deny(unsafe_code)]

pub mod delta;
pub mod document;
pub mod errors;
pub mod events;
pub mod logging;

pub use delta::{Delta, DeltaOp, PathSegment};
pub use document::{Document, DocumentInfo};
pub use errors::{DeltaError, DocumentError};
pub use events::{AgentEvent, CostEntry};
