//! # redline-runtime
//!
//! Session orchestration for the redline client.
//!
//! - **State**: [`SessionState`] holds the transcript, cost ledger, phase
//!   flags, selection, and the [`DocumentHistory`](redline_history::DocumentHistory)
//! - **Router**: [`EventRouter`] applies decoded agent events to the state in
//!   arrival order
//! - **Controller**: [`SessionController`] is the command surface (submit,
//!   cancel, clear, load, remove, undo, redo, export)
//! - **Transport**: [`AgentTransport`] abstracts the agent backend;
//!   [`HttpTransport`] talks to it over HTTP
//! - **Updates**: [`UpdateEmitter`] broadcasts [`SessionUpdate`]s to renderers
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: redline-core, redline-settings,
//! redline-stream, redline-history.
//! Depended on by: redline-agent.

#![deny(unsafe_code)]

pub mod errors;
pub mod session;
pub mod transport;

pub use errors::{RuntimeError, TransportError};
pub use session::controller::{RequestHandle, SessionController};
pub use session::emitter::{SessionUpdate, UpdateEmitter};
pub use session::router::{EventRouter, RouteSummary};
pub use session::state::{
    CostLedger, EntryKind, Phase, Sender, SessionState, SessionView, TranscriptEntry,
};
pub use transport::http::HttpTransport;
pub use transport::{AgentTransport, ByteStream, SubmitRequest};
