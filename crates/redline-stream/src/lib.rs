//! # redline-stream
//!
//! Turns the agent's chunked NDJSON response body into typed events.
//!
//! - [`frame`]: byte chunks → complete text lines ([`LineDecoder`], [`LineStream`])
//! - [`parser`]: one line → [`AgentEvent`](redline_core::AgentEvent) or [`ParseError`]
//!
//! The two halves are independent. Framing knows nothing about event
//! semantics; parsing never sees partial lines.
//!
//! ## Crate Position
//!
//! Depends on: redline-core.
//! Depended on by: redline-runtime.

#![deny(unsafe_code)]

pub mod errors;
pub mod frame;
pub mod parser;

pub use errors::ParseError;
pub use frame::{DecodedLine, DecoderOptions, LineDecoder, LineStream};
pub use parser::parse_line;
