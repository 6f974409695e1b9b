//! Mutable session state.
//!
//! One [`SessionState`] lives behind the controller's mutex. The router and
//! the explicit user commands are the only writers; renderers read a
//! [`SessionView`] snapshot.

use chrono::{DateTime, Utc};
use redline_core::{CostEntry, Document, DocumentInfo};
use redline_history::DocumentHistory;
use serde::Serialize;

/// Request lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No request in flight.
    #[default]
    Idle,
    /// A request is streaming events.
    Streaming,
    /// Stop was requested; waiting for the agent to acknowledge or the
    /// stream to end.
    Cancelling,
}

/// Who produced a transcript entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The local user.
    User,
    /// The remote agent.
    Agent,
}

/// What a transcript entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A submitted prompt.
    Prompt,
    /// Assistant text.
    Message,
    /// A tool invocation notice.
    ToolCall,
    /// A tool failure.
    ToolError,
    /// The agent hit its iteration cap.
    MaxIterations,
    /// The agent acknowledged a stop request.
    Cancelled,
}

/// One line of the chat transcript.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    /// Session-unique id, taken from the event counter.
    pub id: u64,
    /// Producer.
    pub sender: Sender,
    /// Entry type.
    pub kind: EntryKind,
    /// Display text (markdown for agent messages).
    pub text: String,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// Ordered record of what each model call cost.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CostLedger {
    entries: Vec<CostEntry>,
}

impl CostLedger {
    /// Append an entry.
    pub fn record(&mut self, entry: CostEntry) {
        self.entries.push(entry);
    }

    /// Entries in arrival order.
    pub fn entries(&self) -> &[CostEntry] {
        &self.entries
    }

    /// Whether nothing has been billed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Running total as last reported by the agent.
    pub fn total(&self) -> f64 {
        self.entries.last().map_or(0.0, |e| e.total)
    }

    /// `$0.00` before anything is billed, otherwise the total to four places.
    pub fn display_total(&self) -> String {
        if self.entries.is_empty() {
            "$0.00".to_string()
        } else {
            format!("${:.4}", self.total())
        }
    }
}

/// Everything the session knows, guarded by one mutex.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) transcript: Vec<TranscriptEntry>,
    pub(crate) costs: CostLedger,
    pub(crate) phase: Phase,
    pub(crate) compressing_context: bool,
    pub(crate) history: DocumentHistory,
    pub(crate) document: Option<DocumentInfo>,
    pub(crate) selection: Vec<String>,
    pub(crate) last_error: Option<String>,
    /// Incremented once per routed event and per user prompt.
    next_event_id: u64,
    /// Generation of the newest request.
    pub(crate) active_request: u64,
}

impl SessionState {
    /// Empty session with a history bounded at `history_limit` deltas.
    pub fn new(history_limit: usize) -> Self {
        Self {
            transcript: Vec::new(),
            costs: CostLedger::default(),
            phase: Phase::Idle,
            compressing_context: false,
            history: DocumentHistory::new(Document::null(), history_limit),
            document: None,
            selection: Vec::new(),
            last_error: None,
            next_event_id: 0,
            active_request: 0,
        }
    }

    /// Claim the next event id.
    pub(crate) fn next_event_id(&mut self) -> u64 {
        self.next_event_id += 1;
        self.next_event_id
    }

    /// Append a transcript entry and return a copy for broadcasting.
    pub(crate) fn append_entry(
        &mut self,
        id: u64,
        sender: Sender,
        kind: EntryKind,
        text: String,
    ) -> TranscriptEntry {
        let entry = TranscriptEntry {
            id,
            sender,
            kind,
            text,
            timestamp: Utc::now(),
        };
        self.transcript.push(entry.clone());
        entry
    }

    /// Current request lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a request is in flight.
    pub fn loading(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Whether a stop has been requested and not yet acknowledged.
    pub fn cancelling(&self) -> bool {
        self.phase == Phase::Cancelling
    }

    /// Whether the agent is summarising its context.
    pub fn compressing_context(&self) -> bool {
        self.compressing_context
    }

    /// The chat transcript.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// The cost ledger.
    pub fn costs(&self) -> &CostLedger {
        &self.costs
    }

    /// The document history.
    pub fn history(&self) -> &DocumentHistory {
        &self.history
    }

    /// Metadata for the loaded document, if any.
    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref()
    }

    /// Ids of the currently selected document nodes.
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Render-ready copy of the state.
    pub fn view(&self) -> SessionView {
        SessionView {
            document: self.document.as_ref().map(|_| self.history.current().clone()),
            document_info: self.document.clone(),
            transcript: self.transcript.clone(),
            costs: self.costs.clone(),
            total_cost: self.costs.display_total(),
            phase: self.phase,
            loading: self.loading(),
            cancelling: self.cancelling(),
            compressing_context: self.compressing_context,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            selection: self.selection.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Immutable snapshot handed to renderers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Current document, `None` when nothing is loaded.
    pub document: Option<Document>,
    /// File metadata of the loaded document.
    pub document_info: Option<DocumentInfo>,
    /// Chat transcript.
    pub transcript: Vec<TranscriptEntry>,
    /// Cost ledger.
    pub costs: CostLedger,
    /// Formatted running total.
    pub total_cost: String,
    /// Request phase.
    pub phase: Phase,
    /// A request is in flight.
    pub loading: bool,
    /// A stop is pending.
    pub cancelling: bool,
    /// The agent is summarising its context.
    pub compressing_context: bool,
    /// Undo is available.
    pub can_undo: bool,
    /// Redo is available.
    pub can_redo: bool,
    /// Selected node ids.
    pub selection: Vec<String>,
    /// Error from the last failed request.
    pub last_error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
