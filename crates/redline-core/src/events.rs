//! Typed agent events.
//!
//! One [`AgentEvent`] is decoded from each line of the agent's NDJSON
//! response stream. Events are transient: the router consumes each one
//! exactly once and discards it.
//!
//! The wire discriminator is the `type` field:
//!
//! | `type` | Variant |
//! |--------|---------|
//! | `message` | [`AgentEvent::Message`] |
//! | `tool_call` | [`AgentEvent::ToolCall`] |
//! | `tool_result` | [`AgentEvent::ToolResult`] |
//! | `tool_error` | [`AgentEvent::ToolError`] |
//! | `max_iterations` | [`AgentEvent::MaxIterations`] |
//! | `cost` | [`AgentEvent::Cost`] |
//! | `compressing_context` | [`AgentEvent::CompressingContext`] |
//! | `cancelled` | [`AgentEvent::Cancelled`] |

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// A decoded event from the agent stream.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentEvent {
    /// Assistant text.
    Message {
        /// Message body (markdown).
        content: String,
    },

    /// The agent invoked a tool.
    ToolCall {
        /// Tool name.
        name: String,
    },

    /// A tool returned a new version of the document.
    ToolResult {
        /// The proposed document.
        document: Document,
    },

    /// A tool failed.
    ToolError {
        /// Error text reported by the agent.
        content: String,
    },

    /// The agent hit its iteration cap.
    MaxIterations,

    /// Spend for one model call.
    Cost(CostEntry),

    /// The agent started summarising its context.
    CompressingContext,

    /// The agent acknowledged a cancellation request.
    Cancelled,
}

impl AgentEvent {
    /// Wire name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::ToolError { .. } => "tool_error",
            Self::MaxIterations => "max_iterations",
            Self::Cost(_) => "cost",
            Self::CompressingContext => "compressing_context",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One line of the running cost ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    /// What was billed (e.g. `"query"`, `"summary"`).
    pub kind: String,
    /// Cost of this call in dollars.
    pub cost: f64,
    /// Running total reported by the agent.
    pub total: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
