//! # Document History
//!
//! A linear undo/redo log of reversible deltas over one document.
//!
//! ```text
//!  baseline ──Δ0──▶ ──Δ1──▶ ──Δ2──▶ ──Δ3──▶
//!                            ▲
//!                         pointer = 1   (Δ2, Δ3 are the redo tail)
//! ```
//!
//! Invariants:
//! - `current` always equals `baseline` with `deltas[0..=pointer]` applied
//! - `deltas.len() <= limit`
//! - every transition is all-or-nothing: a failed patch leaves the history
//!   exactly as it was
//!
//! Compaction folds the oldest delta into the baseline when a commit pushes
//! the list past its limit. The folded delta is always an applied one, so
//! `current` never changes during compaction.

use std::collections::VecDeque;

use metrics::counter;
use redline_core::{Delta, Document};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::HistoryError;

/// Deltas retained when no limit is configured.
pub const DEFAULT_LIMIT: usize = 20;

/// Bounded, reversible edit log over an immutable [`Document`].
#[derive(Clone, Debug)]
pub struct DocumentHistory {
    baseline: Document,
    current: Document,
    deltas: VecDeque<Delta>,
    /// Number of deltas currently applied (`pointer + 1`).
    applied: usize,
    limit: usize,
}

impl Default for DocumentHistory {
    fn default() -> Self {
        Self::new(Document::null(), DEFAULT_LIMIT)
    }
}

impl DocumentHistory {
    /// Start a history at `baseline`.
    ///
    /// `limit` is clamped to at least 1.
    pub fn new(baseline: Document, limit: usize) -> Self {
        Self {
            current: baseline.clone(),
            baseline,
            deltas: VecDeque::new(),
            applied: 0,
            limit: limit.max(1),
        }
    }

    /// The latest document state.
    pub fn current(&self) -> &Document {
        &self.current
    }

    /// The state every recorded delta is replayed from.
    pub fn baseline(&self) -> &Document {
        &self.baseline
    }

    /// Index of the last applied delta, `None` when only the baseline is
    /// applied.
    pub fn pointer(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// Number of recorded deltas, applied or not.
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Whether no deltas are recorded.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Maximum number of recorded deltas.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether [`undo`](Self::undo) would change anything.
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    /// Whether [`redo`](Self::redo) would change anything.
    pub fn can_redo(&self) -> bool {
        self.applied < self.deltas.len()
    }

    /// Record `next` as the new current document.
    ///
    /// Returns `Ok(false)` when `next` equals the current document. A commit
    /// after an undo discards the redo tail.
    pub fn commit(&mut self, next: Document) -> Result<bool, HistoryError> {
        let delta = Delta::diff(self.current.value(), next.value());
        if delta.is_empty() {
            debug!("commit without changes, nothing recorded");
            return Ok(false);
        }

        // Folding happens before anything is mutated so a failure leaves
        // the history untouched. Only applied deltas are ever folded.
        let retained = self.applied + 1;
        let overflow = retained.saturating_sub(self.limit);
        let new_baseline = if overflow > 0 {
            Some(self.fold(overflow)?)
        } else {
            None
        };

        let discarded = self.deltas.len() - self.applied;
        if discarded > 0 {
            debug!(discarded, "commit discards redo tail");
        }
        self.deltas.truncate(self.applied);
        self.deltas.push_back(delta);
        self.applied += 1;
        self.current = next;

        if let Some(baseline) = new_baseline {
            drop(self.deltas.drain(..overflow));
            self.applied -= overflow;
            self.baseline = baseline;
            counter!("redline_history_compactions_total").increment(overflow as u64);
            debug!(folded = overflow, "compacted history");
        }

        counter!("redline_history_commits_total").increment(1);
        debug!(
            deltas = self.deltas.len(),
            pointer = ?self.pointer(),
            "committed document change"
        );
        Ok(true)
    }

    /// Step back one delta.
    ///
    /// Returns `Ok(false)` when only the baseline is applied.
    pub fn undo(&mut self) -> Result<bool, HistoryError> {
        let Some(index) = self.pointer() else {
            return Ok(false);
        };
        let mut value = self.current.to_value();
        self.deltas[index].unapply(&mut value).map_err(|source| {
            warn!(index, error = %source, "undo failed, history unchanged");
            HistoryError::Undo { index, source }
        })?;
        self.current = Document::new(value);
        self.applied -= 1;
        Ok(true)
    }

    /// Step forward one delta.
    ///
    /// Returns `Ok(false)` when no undone delta remains.
    pub fn redo(&mut self) -> Result<bool, HistoryError> {
        if !self.can_redo() {
            return Ok(false);
        }
        let index = self.applied;
        let mut value = self.current.to_value();
        self.deltas[index].apply(&mut value).map_err(|source| {
            warn!(index, error = %source, "redo failed, history unchanged");
            HistoryError::Redo { index, source }
        })?;
        self.current = Document::new(value);
        self.applied += 1;
        Ok(true)
    }

    /// Drop every delta and start over at `baseline`.
    pub fn reset(&mut self, baseline: Document) {
        self.deltas.clear();
        self.applied = 0;
        self.current = baseline.clone();
        self.baseline = baseline;
    }

    /// Rebuild the current state from the baseline by applying every
    /// applied delta in order.
    pub fn replay(&self) -> Result<Value, HistoryError> {
        let mut value = self.baseline.to_value();
        for delta in self.deltas.iter().take(self.applied) {
            delta
                .apply(&mut value)
                .map_err(|source| HistoryError::Compaction { source })?;
        }
        Ok(value)
    }

    /// Baseline with the oldest `count` deltas applied.
    fn fold(&self, count: usize) -> Result<Document, HistoryError> {
        let mut value = self.baseline.to_value();
        for delta in self.deltas.iter().take(count) {
            delta.apply(&mut value).map_err(|source| {
                warn!(error = %source, "compaction failed, history unchanged");
                HistoryError::Compaction { source }
            })?;
        }
        Ok(Document::new(value))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use redline_core::{DeltaError, DeltaOp, PathSegment};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::new(value)
    }

    fn assert_consistent(history: &DocumentHistory) {
        assert_eq!(&history.replay().unwrap(), history.current().value());
        assert!(history.len() <= history.limit());
    }

    // ── Commit ───────────────────────────────────────────────────────────

    #[test]
    fn fresh_history_has_nothing_to_undo() {
        let history = DocumentHistory::new(doc(json!({"a": 1})), 5);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.pointer(), None);
        assert!(history.is_empty());
    }

    #[test]
    fn commit_advances_pointer() {
        let mut history = DocumentHistory::new(doc(json!({"a": 1})), 5);
        assert!(history.commit(doc(json!({"a": 2}))).unwrap());
        assert!(history.commit(doc(json!({"a": 3}))).unwrap());
        assert_eq!(history.pointer(), Some(1));
        assert_eq!(history.current().value(), &json!({"a": 3}));
        assert_consistent(&history);
    }

    #[test]
    fn committing_current_again_records_nothing() {
        let mut history = DocumentHistory::new(doc(json!({"a": 1})), 5);
        let _ = history.commit(doc(json!({"a": 2}))).unwrap();
        assert!(!history.commit(doc(json!({"a": 2}))).unwrap());
        assert_eq!(history.len(), 1);
        assert_eq!(history.pointer(), Some(0));
    }

    #[test]
    fn commit_after_undo_discards_redo_tail() {
        let mut history = DocumentHistory::new(doc(json!(0)), 10);
        for n in 1..=3 {
            let _ = history.commit(doc(json!(n))).unwrap();
        }
        let _ = history.undo().unwrap();
        let _ = history.undo().unwrap();
        assert!(history.can_redo());

        assert!(history.commit(doc(json!(42))).unwrap());
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().value(), &json!(42));
        assert_consistent(&history);
    }

    #[test]
    fn current_is_shared_not_copied() {
        let mut history = DocumentHistory::default();
        let next = doc(json!({"big": [1, 2, 3]}));
        let _ = history.commit(next.clone()).unwrap();
        assert!(history.current().ptr_eq(&next));
    }

    // ── Undo / redo ──────────────────────────────────────────────────────

    #[test]
    fn undo_undo_redo_scenario() {
        let mut history = DocumentHistory::new(doc(json!({"a": 1})), DEFAULT_LIMIT);
        let _ = history.commit(doc(json!({"a": 2}))).unwrap();
        let _ = history.commit(doc(json!({"a": 3}))).unwrap();

        assert!(history.undo().unwrap());
        assert!(history.undo().unwrap());
        assert_eq!(history.current().value(), &json!({"a": 1}));
        assert!(history.redo().unwrap());

        assert_eq!(history.current().value(), &json!({"a": 2}));
        assert!(history.can_redo());
        assert!(history.can_undo());
        assert_consistent(&history);
    }

    #[test]
    fn undo_at_baseline_is_noop() {
        let mut history = DocumentHistory::new(doc(json!([1])), 3);
        assert!(!history.undo().unwrap());
        assert_eq!(history.current().value(), &json!([1]));
    }

    #[test]
    fn redo_at_end_is_noop() {
        let mut history = DocumentHistory::new(doc(json!([1])), 3);
        let _ = history.commit(doc(json!([1, 2]))).unwrap();
        assert!(!history.redo().unwrap());
        assert_eq!(history.current().value(), &json!([1, 2]));
    }

    #[test]
    fn undo_then_redo_restores_nested_edit() {
        let start = json!({
            "title": "Report",
            "rows": [{"id": 1, "v": "a"}, {"id": 2, "v": "b"}],
        });
        let edited = json!({
            "title": "Report",
            "rows": [{"id": 1, "v": "a"}, {"id": 2, "v": "B"}, {"id": 3, "v": "c"}],
            "footer": true,
        });
        let mut history = DocumentHistory::new(doc(start.clone()), 4);
        let _ = history.commit(doc(edited.clone())).unwrap();

        let _ = history.undo().unwrap();
        assert_eq!(history.current().value(), &start);
        let _ = history.redo().unwrap();
        assert_eq!(history.current().value(), &edited);
    }

    #[test]
    fn failed_undo_leaves_history_unchanged() {
        // Corrupt the recorded delta so it no longer matches the document.
        let mut history = DocumentHistory::new(doc(json!({"a": 1})), 5);
        let _ = history.commit(doc(json!({"a": 2}))).unwrap();
        history.deltas[0] = Delta::from_ops(vec![DeltaOp::Replace {
            path: vec![PathSegment::Key("missing".into())],
            old: json!(1),
            new: json!(2),
        }]);

        let err = history.undo().unwrap_err();
        assert_matches!(
            err,
            HistoryError::Undo {
                index: 0,
                source: DeltaError::PathNotFound { .. }
            }
        );
        assert_eq!(history.current().value(), &json!({"a": 2}));
        assert_eq!(history.pointer(), Some(0));
    }

    #[test]
    fn failed_redo_leaves_history_unchanged() {
        let mut history = DocumentHistory::new(doc(json!({"a": 1})), 5);
        let _ = history.commit(doc(json!({"a": 2}))).unwrap();
        let _ = history.undo().unwrap();
        history.deltas[0] = Delta::from_ops(vec![DeltaOp::Replace {
            path: vec![PathSegment::Key("a".into())],
            old: json!("not one"),
            new: json!(2),
        }]);

        assert_matches!(history.redo(), Err(HistoryError::Redo { index: 0, .. }));
        assert_eq!(history.current().value(), &json!({"a": 1}));
        assert_eq!(history.pointer(), None);
    }

    // ── Compaction ───────────────────────────────────────────────────────

    #[test]
    fn compaction_bounds_length_and_keeps_current() {
        let mut history = DocumentHistory::new(doc(json!({"n": 0})), 3);
        for n in 1..=10 {
            let _ = history.commit(doc(json!({"n": n}))).unwrap();
            assert_consistent(&history);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.pointer(), Some(2));
        assert_eq!(history.baseline().value(), &json!({"n": 7}));
        assert_eq!(history.current().value(), &json!({"n": 10}));

        // only three steps back remain
        for _ in 0..3 {
            assert!(history.undo().unwrap());
        }
        assert!(!history.undo().unwrap());
        assert_eq!(history.current().value(), &json!({"n": 7}));
    }

    #[test]
    fn limit_is_clamped_to_one() {
        let mut history = DocumentHistory::new(doc(json!(0)), 0);
        assert_eq!(history.limit(), 1);
        let _ = history.commit(doc(json!(1))).unwrap();
        let _ = history.commit(doc(json!(2))).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.baseline().value(), &json!(1));
        assert!(history.undo().unwrap());
        assert_eq!(history.current().value(), &json!(1));
    }

    #[test]
    fn commit_after_undo_at_limit_does_not_compact() {
        let mut history = DocumentHistory::new(doc(json!(0)), 2);
        let _ = history.commit(doc(json!(1))).unwrap();
        let _ = history.commit(doc(json!(2))).unwrap();
        let _ = history.undo().unwrap();

        let _ = history.commit(doc(json!(9))).unwrap();
        assert_eq!(history.baseline().value(), &json!(0));
        assert_eq!(history.len(), 2);
        assert_consistent(&history);
    }

    // ── Reset ────────────────────────────────────────────────────────────

    #[test]
    fn reset_clears_everything() {
        let mut history = DocumentHistory::new(doc(json!(1)), 5);
        let _ = history.commit(doc(json!(2))).unwrap();
        let _ = history.undo().unwrap();

        history.reset(doc(json!({"fresh": true})));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.is_empty());
        assert_eq!(history.baseline(), history.current());
        assert_eq!(history.current().value(), &json!({"fresh": true}));
    }

    // ── Properties ───────────────────────────────────────────────────────

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_doc() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                (0i64..5).prop_map(|n| json!(n)),
                "[ab]{0,2}".prop_map(Value::String),
            ];
            leaf.prop_recursive(3, 24, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::btree_map("[a-d]", inner, 0..4)
                        .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        proptest! {
            #[test]
            fn commits_then_undo_redo_round_trip(
                docs in prop::collection::vec(arb_doc(), 1..8),
                limit in 1usize..5,
                steps in 0usize..8,
            ) {
                let mut history = DocumentHistory::new(Document::null(), limit);
                for d in &docs {
                    let _ = history.commit(Document::new(d.clone())).unwrap();
                    prop_assert_eq!(&history.replay().unwrap(), history.current().value());
                    prop_assert!(history.len() <= limit);
                }
                let last = docs.last().cloned().unwrap();
                prop_assert_eq!(history.current().value(), &last);

                let mut undone = 0;
                for _ in 0..steps {
                    if history.undo().unwrap() {
                        undone += 1;
                    }
                    prop_assert_eq!(&history.replay().unwrap(), history.current().value());
                }
                for _ in 0..undone {
                    prop_assert!(history.redo().unwrap());
                }
                prop_assert_eq!(history.current().value(), &last);
                prop_assert!(!history.can_redo());
            }
        }
    }
}
