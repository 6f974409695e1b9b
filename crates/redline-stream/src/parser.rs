//! # Event Parser
//!
//! Maps one NDJSON line to an [`AgentEvent`].
//!
//! | Outcome | When |
//! |---------|------|
//! | `Ok(Some(event))` | known `type` with a well-formed payload |
//! | `Ok(None)` | blank line, missing or unknown `type`, or an `Error`-prefixed tool result |
//! | `Err(ParseError)` | invalid JSON, a known `type` with missing fields, or a tool result whose nested text is not JSON |
//!
//! `tool_result` payloads arrive in three shapes (field `payload`, alias
//! `content`):
//!
//! ```json
//! {"type":"tool_result","payload":{"title":"doc"}}
//! {"type":"tool_result","payload":"{\"title\":\"doc\"}"}
//! {"type":"tool_result","content":[{"type":"text","text":"{\"title\":\"doc\"}"}]}
//! ```
//!
//! Tools report failures as text starting with `Error`. Those results carry
//! no document and are skipped.
// TODO: switch to a structured `is_error` field once the agent protocol carries one.

use redline_core::{AgentEvent, CostEntry, Document};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::ParseError;

/// Wire discriminators this parser understands.
const KNOWN_TYPES: &[&str] = &[
    "message",
    "tool_call",
    "tool_result",
    "tool_error",
    "max_iterations",
    "cost",
    "compressing_context",
    "cancelled",
];

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Message {
        content: String,
    },
    ToolCall {
        name: String,
    },
    ToolResult {
        #[serde(alias = "content")]
        payload: Value,
    },
    ToolError {
        content: String,
    },
    MaxIterations,
    Cost {
        kind: String,
        cost: f64,
        total: f64,
    },
    CompressingContext,
    Cancelled,
}

/// Parse a single stream line.
pub fn parse_line(line: &str) -> Result<Option<AgentEvent>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line).map_err(|e| ParseError::Malformed {
        line: line.to_owned(),
        reason: e.to_string(),
    })?;

    let Some(event_type) = value.get("type").and_then(Value::as_str) else {
        debug!("stream record without a type, ignoring");
        return Ok(None);
    };
    if !KNOWN_TYPES.contains(&event_type) {
        debug!(event_type, "unknown event type, ignoring");
        return Ok(None);
    }
    let event_type = event_type.to_owned();

    let wire: WireEvent = serde_json::from_value(value).map_err(|e| ParseError::InvalidEvent {
        event_type: event_type.clone(),
        reason: e.to_string(),
        line: line.to_owned(),
    })?;

    let event = match wire {
        WireEvent::Message { content } => AgentEvent::Message { content },
        WireEvent::ToolCall { name } => AgentEvent::ToolCall { name },
        WireEvent::ToolResult { payload } => {
            return tool_result_document(payload, line)
                .map(|doc| doc.map(|document| AgentEvent::ToolResult { document }));
        }
        WireEvent::ToolError { content } => AgentEvent::ToolError { content },
        WireEvent::MaxIterations => AgentEvent::MaxIterations,
        WireEvent::Cost { kind, cost, total } => AgentEvent::Cost(CostEntry { kind, cost, total }),
        WireEvent::CompressingContext => AgentEvent::CompressingContext,
        WireEvent::Cancelled => AgentEvent::Cancelled,
    };
    Ok(Some(event))
}

/// Extract the proposed document from a `tool_result` payload.
fn tool_result_document(payload: Value, line: &str) -> Result<Option<Document>, ParseError> {
    let text = match payload {
        Value::Null => {
            return Err(ParseError::InvalidEvent {
                event_type: "tool_result".into(),
                reason: "payload is null".into(),
                line: line.to_owned(),
            });
        }
        Value::String(text) => text,
        Value::Array(items) => match text_blocks(&items) {
            Some(text) => text,
            None => return Ok(Some(Document::new(Value::Array(items)))),
        },
        other => return Ok(Some(Document::new(other))),
    };

    if text.trim_start().starts_with("Error") {
        debug!(
            preview = %text.chars().take(80).collect::<String>(),
            "tool reported an error, skipping result"
        );
        return Ok(None);
    }

    serde_json::from_str::<Value>(&text)
        .map(|value| Some(Document::new(value)))
        .map_err(|e| ParseError::InvalidToolResult {
            reason: e.to_string(),
            line: line.to_owned(),
        })
}

/// Concatenate `[{"type":"text","text":..}]` blocks.
///
/// Returns `None` unless the array is non-empty and every element is a text
/// block, in which case the array is treated as the document itself.
fn text_blocks(items: &[Value]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut out = String::new();
    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("text") {
            return None;
        }
        out.push_str(item.get("text")?.as_str()?);
    }
    Some(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
