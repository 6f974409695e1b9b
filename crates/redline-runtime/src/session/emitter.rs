//! Broadcast of session changes to renderers.

use std::sync::atomic::{AtomicU64, Ordering};

use redline_core::{CostEntry, Document};
use tokio::sync::broadcast;

use crate::session::state::{Phase, TranscriptEntry};

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// A change a renderer may want to redraw for.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    /// A transcript entry was appended.
    TranscriptAppended(TranscriptEntry),
    /// A cost entry was recorded.
    CostRecorded {
        /// The new entry.
        entry: CostEntry,
        /// Formatted running total.
        display_total: String,
    },
    /// The current document changed (commit, undo, redo, load, remove).
    DocumentChanged {
        /// New snapshot, `None` after removal.
        document: Option<Document>,
        /// Undo is available.
        can_undo: bool,
        /// Redo is available.
        can_redo: bool,
    },
    /// The request phase changed.
    PhaseChanged(Phase),
    /// The context-compression flag changed.
    FlagsChanged {
        /// The agent is summarising its context.
        compressing_context: bool,
    },
    /// A request's stream ended.
    RequestFinished {
        /// Request generation.
        request_id: u64,
        /// Transport failure, if the request did not end cleanly.
        error: Option<String>,
    },
    /// Transcript and selection were cleared.
    ContextCleared,
}

/// Non-blocking broadcast of [`SessionUpdate`]s.
///
/// Slow receivers lag (and see `RecvError::Lagged`) rather than blocking
/// the event pipeline.
pub struct UpdateEmitter {
    tx: broadcast::Sender<SessionUpdate>,
    emit_count: AtomicU64,
}

impl UpdateEmitter {
    /// Create an emitter with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an emitter with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Publish an update. Returns how many receivers got it.
    pub fn emit(&self, update: SessionUpdate) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(update).unwrap_or(0)
    }

    /// Publish several updates in order.
    pub fn emit_all(&self, updates: impl IntoIterator<Item = SessionUpdate>) {
        for update in updates {
            let _ = self.emit(update);
        }
    }

    /// Receive every update published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total updates published.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for UpdateEmitter {
    fn default() -> Self {
        Self::new()
    }
}
