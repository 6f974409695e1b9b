//! Agent backend transport.
//!
//! The controller only depends on [`AgentTransport`]. [`http::HttpTransport`]
//! is the production implementation; tests script their own.

pub mod http;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use redline_core::Document;
use serde::Serialize;

use crate::errors::TransportError;

/// Response body of a submitted prompt, as raw chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Body of a prompt submission.
#[derive(Clone, Debug, Serialize)]
pub struct SubmitRequest {
    /// The user's prompt, trimmed.
    pub query: String,
    /// Snapshot of the current document.
    pub document: Document,
    /// Ids of the selected document nodes.
    pub selection: Vec<String>,
}

/// Connection to the remote agent.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// One-time handshake so the backend can prepare its tools.
    async fn setup(&self) -> Result<(), TransportError>;

    /// Send a prompt. The returned stream carries the NDJSON event body.
    async fn submit(&self, request: &SubmitRequest) -> Result<ByteStream, TransportError>;

    /// Ask the agent to stop the current request.
    async fn cancel(&self) -> Result<(), TransportError>;

    /// Ask the agent to forget the conversation so far.
    async fn clear_context(&self) -> Result<(), TransportError>;
}
