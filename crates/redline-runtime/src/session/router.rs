//! # Event Router
//!
//! Applies decoded agent events to the session, one at a time, in the order
//! they arrived on the wire.
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Message` | agent transcript entry with the message text |
//! | `ToolCall` | ``🔧 Calling tool `name` `` |
//! | `ToolError` | `❌ Tool error: …` |
//! | `MaxIterations` | `⚠️ Reached maximum iterations` |
//! | `Cancelled` | `🛑 Request cancelled`, and acknowledges a pending stop |
//! | `Cost` | appended to the cost ledger |
//! | `CompressingContext` | sets the compressing flag |
//! | `ToolResult` | committed to the document history |
//!
//! The session lock is held only while one event is applied. Updates are
//! broadcast after the lock is released.

use std::sync::Arc;

use futures::StreamExt;
use metrics::counter;
use parking_lot::Mutex;
use redline_core::AgentEvent;
use redline_stream::{LineStream, parse_line};
use tracing::{debug, error, info, warn};

use crate::errors::TransportError;
use crate::session::emitter::{SessionUpdate, UpdateEmitter};
use crate::session::state::{EntryKind, Phase, Sender, SessionState};
use crate::transport::ByteStream;

/// Counts for one routed request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteSummary {
    /// Events applied to the session.
    pub events_routed: usize,
    /// Lines that failed to parse.
    pub lines_skipped: usize,
    /// Tool results committed as a new document version.
    pub documents_committed: usize,
}

/// Routes one request's event stream into the session.
pub struct EventRouter {
    request_id: u64,
    state: Arc<Mutex<SessionState>>,
    emitter: Arc<UpdateEmitter>,
}

impl EventRouter {
    /// Router for request generation `request_id`.
    pub fn new(request_id: u64, state: Arc<Mutex<SessionState>>, emitter: Arc<UpdateEmitter>) -> Self {
        Self {
            request_id,
            state,
            emitter,
        }
    }

    /// Request generation this router serves.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Apply one event to `state`.
    ///
    /// Returns the updates to broadcast once the lock is released.
    pub fn route(&self, state: &mut SessionState, event: AgentEvent) -> Vec<SessionUpdate> {
        let id = state.next_event_id();
        counter!("redline_events_routed_total", "type" => event.event_type()).increment(1);

        let (kind, text) = match event {
            AgentEvent::Message { content } => (EntryKind::Message, content),
            AgentEvent::ToolCall { name } => {
                (EntryKind::ToolCall, format!("🔧 Calling tool `{name}`"))
            }
            AgentEvent::ToolError { content } => {
                (EntryKind::ToolError, format!("❌ Tool error: {content}"))
            }
            AgentEvent::MaxIterations => (
                EntryKind::MaxIterations,
                "⚠️ Reached maximum iterations".to_string(),
            ),
            AgentEvent::Cancelled => {
                let entry = state.append_entry(
                    id,
                    Sender::Agent,
                    EntryKind::Cancelled,
                    "🛑 Request cancelled".into(),
                );
                let mut updates = vec![SessionUpdate::TranscriptAppended(entry)];
                if state.phase == Phase::Cancelling && state.active_request == self.request_id {
                    state.phase = Phase::Idle;
                    info!(request_id = self.request_id, "cancellation acknowledged");
                    updates.push(SessionUpdate::PhaseChanged(Phase::Idle));
                }
                return updates;
            }
            AgentEvent::Cost(entry) => {
                state.costs.record(entry.clone());
                return vec![SessionUpdate::CostRecorded {
                    entry,
                    display_total: state.costs.display_total(),
                }];
            }
            AgentEvent::CompressingContext => {
                if state.compressing_context {
                    return Vec::new();
                }
                state.compressing_context = true;
                return vec![SessionUpdate::FlagsChanged {
                    compressing_context: true,
                }];
            }
            AgentEvent::ToolResult { document } => {
                return match state.history.commit(document) {
                    Ok(true) => vec![SessionUpdate::DocumentChanged {
                        document: Some(state.history.current().clone()),
                        can_undo: state.history.can_undo(),
                        can_redo: state.history.can_redo(),
                    }],
                    Ok(false) => {
                        debug!("tool result matches current document");
                        Vec::new()
                    }
                    Err(e) => {
                        error!(error = %e, category = e.category(), "failed to commit tool result");
                        Vec::new()
                    }
                };
            }
        };

        let entry = state.append_entry(id, Sender::Agent, kind, text);
        vec![SessionUpdate::TranscriptAppended(entry)]
    }

    /// Decode, parse, and route every line of `lines`.
    ///
    /// Unparseable lines are logged and skipped. A transport failure ends
    /// routing; events already applied stay applied.
    pub async fn run(
        &self,
        mut lines: LineStream<ByteStream, TransportError>,
    ) -> (RouteSummary, Option<TransportError>) {
        let mut summary = RouteSummary::default();

        while let Some(line) = lines.next().await {
            let event = match parse_line(&line.text) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    summary.lines_skipped += 1;
                    counter!("redline_parse_failures_total", "category" => e.category()).increment(1);
                    warn!(
                        error = %e,
                        line = %preview(e.line()),
                        terminated = line.terminated,
                        "skipping unparseable stream line"
                    );
                    continue;
                }
            };

            let is_result = matches!(event, AgentEvent::ToolResult { .. });
            let updates = {
                let mut state = self.state.lock();
                self.route(&mut state, event)
            };
            summary.events_routed += 1;
            if is_result && !updates.is_empty() {
                summary.documents_committed += 1;
            }
            self.emitter.emit_all(updates);
        }

        (summary, lines.take_error())
    }

    /// End-of-stream cleanup.
    ///
    /// Clears the in-flight flags unless a newer request has taken over the
    /// session, then broadcasts [`SessionUpdate::RequestFinished`].
    pub fn finish(&self, error: Option<&TransportError>) {
        let message = error.map(ToString::to_string);
        let mut updates = Vec::new();
        {
            let mut state = self.state.lock();
            if state.active_request == self.request_id {
                if state.phase != Phase::Idle {
                    state.phase = Phase::Idle;
                    updates.push(SessionUpdate::PhaseChanged(Phase::Idle));
                }
                if state.compressing_context {
                    state.compressing_context = false;
                    updates.push(SessionUpdate::FlagsChanged {
                        compressing_context: false,
                    });
                }
                if message.is_some() {
                    state.last_error.clone_from(&message);
                }
            } else {
                debug!(
                    request_id = self.request_id,
                    active = state.active_request,
                    "superseded request finished, leaving flags alone"
                );
            }
        }

        match error {
            Some(e) => error!(request_id = self.request_id, error = %e, category = e.category(), "request failed"),
            None => info!(request_id = self.request_id, "request finished"),
        }
        updates.push(SessionUpdate::RequestFinished {
            request_id: self.request_id,
            error: message,
        });
        self.emitter.emit_all(updates);
    }
}

fn preview(line: &str) -> String {
    const MAX: usize = 120;
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        let head: String = line.chars().take(MAX).collect();
        format!("{head}…")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
