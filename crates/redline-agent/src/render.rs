//! Terminal rendering of session updates.

use redline_runtime::{Phase, SessionUpdate, SessionView, TranscriptEntry};

/// One printable line for an update, or `None` when it is not worth showing.
pub fn describe(update: &SessionUpdate) -> Option<String> {
    match update {
        SessionUpdate::TranscriptAppended(entry) => Some(entry_line(entry)),
        SessionUpdate::CostRecorded {
            entry,
            display_total,
        } => Some(format!("  cost {} ${:.4} (total {display_total})", entry.kind, entry.cost)),
        SessionUpdate::DocumentChanged {
            document: Some(_),
            can_undo,
            can_redo,
        } => Some(format!("  document updated (undo: {can_undo}, redo: {can_redo})")),
        SessionUpdate::DocumentChanged { document: None, .. } => Some("  document removed".into()),
        SessionUpdate::FlagsChanged {
            compressing_context: true,
        } => Some("  compressing context…".into()),
        SessionUpdate::PhaseChanged(Phase::Cancelling) => Some("  cancelling…".into()),
        SessionUpdate::RequestFinished {
            error: Some(error), ..
        } => Some(format!("  request failed: {error}")),
        SessionUpdate::RequestFinished { error: None, .. } => Some("  done".into()),
        SessionUpdate::ContextCleared => Some("  context cleared".into()),
        SessionUpdate::PhaseChanged(_) | SessionUpdate::FlagsChanged { .. } => None,
    }
}

fn entry_line(entry: &TranscriptEntry) -> String {
    let who = match entry.sender {
        redline_runtime::Sender::User => "you",
        redline_runtime::Sender::Agent => "agent",
    };
    format!("[{}] {who}: {}", entry.timestamp.format("%H:%M:%S"), entry.text)
}

/// Multi-line status summary for `/status`.
pub fn status(view: &SessionView) -> String {
    let document = match &view.document_info {
        Some(info) => format!("{} ({})", info.name, info.display_size()),
        None => "none".to_string(),
    };
    let mut out = format!(
        "document:  {document}\nphase:     {:?}\ncost:      {}\nundo/redo: {}/{}\nmessages:  {}",
        view.phase,
        view.total_cost,
        view.can_undo,
        view.can_redo,
        view.transcript.len(),
    );
    if !view.selection.is_empty() {
        out.push_str(&format!("\nselection: {}", view.selection.join(", ")));
    }
    if let Some(error) = &view.last_error {
        out.push_str(&format!("\nlast error: {error}"));
    }
    out
}
