//! Reversible structural deltas between two JSON documents.
//!
//! [`Delta::diff`] walks two values and records the smallest set of
//! operations it can find that turns the source into the destination:
//!
//! - Objects are compared key by key. Removed keys and inserted keys record
//!   their position so key order survives a round trip.
//! - Arrays are aligned with an LCS over element equality after trimming the
//!   common prefix and suffix. A deletion paired with an insertion at the same
//!   position becomes a nested diff, so editing one field of one table row
//!   records one `Replace` instead of a row swap.
//! - Scalars and strings are replaced whole.
//!
//! Every operation stores both the old and the new value, so a delta is its
//! own inverse recipe: [`Delta::unapply`] replays the inverted operations in
//! reverse order.
//!
//! `diff` only borrows its inputs. `apply` and `unapply` mutate the value they
//! are given; callers that must preserve a snapshot hand them an owned copy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DeltaError;

/// Upper bound on LCS table cells before array alignment falls back to a
/// positional comparison.
const MAX_LCS_CELLS: usize = 4_000_000;

/// One step of a path into a JSON document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Array element index.
    Index(usize),
    /// Object key.
    Key(String),
}

/// A single reversible edit.
///
/// Paths address the container (or, for `Replace`, the value itself) in the
/// document state at the moment the operation runs, after all earlier
/// operations of the same delta have been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DeltaOp {
    /// Swap the value at `path`.
    Replace {
        /// Location of the value.
        path: Vec<PathSegment>,
        /// Value before the edit.
        old: Value,
        /// Value after the edit.
        new: Value,
    },
    /// Insert `key` into the object at `path` at position `index`.
    InsertKey {
        /// Location of the object.
        path: Vec<PathSegment>,
        /// Position of the key in the object's key order.
        index: usize,
        /// Inserted key.
        key: String,
        /// Inserted value.
        value: Value,
    },
    /// Remove `key` (found at position `index`) from the object at `path`.
    RemoveKey {
        /// Location of the object.
        path: Vec<PathSegment>,
        /// Position the key occupied.
        index: usize,
        /// Removed key.
        key: String,
        /// Removed value.
        value: Value,
    },
    /// Insert an element into the array at `path`.
    InsertItem {
        /// Location of the array.
        path: Vec<PathSegment>,
        /// Position of the new element.
        index: usize,
        /// Inserted element.
        value: Value,
    },
    /// Remove the element at `index` from the array at `path`.
    RemoveItem {
        /// Location of the array.
        path: Vec<PathSegment>,
        /// Position of the removed element.
        index: usize,
        /// Removed element.
        value: Value,
    },
}

impl DeltaOp {
    /// The operation that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self.clone() {
            Self::Replace { path, old, new } => Self::Replace {
                path,
                old: new,
                new: old,
            },
            Self::InsertKey {
                path,
                index,
                key,
                value,
            } => Self::RemoveKey {
                path,
                index,
                key,
                value,
            },
            Self::RemoveKey {
                path,
                index,
                key,
                value,
            } => Self::InsertKey {
                path,
                index,
                key,
                value,
            },
            Self::InsertItem { path, index, value } => Self::RemoveItem { path, index, value },
            Self::RemoveItem { path, index, value } => Self::InsertItem { path, index, value },
        }
    }

    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Replace { .. } => "replace",
            Self::InsertKey { .. } => "insert_key",
            Self::RemoveKey { .. } => "remove_key",
            Self::InsertItem { .. } => "insert_item",
            Self::RemoveItem { .. } => "remove_item",
        }
    }

    /// Apply this operation to `doc` in place.
    pub fn apply(&self, doc: &mut Value) -> Result<(), DeltaError> {
        match self {
            Self::Replace { path, old, new } => {
                let target = resolve_mut(doc, path)?;
                if *target != *old {
                    return Err(DeltaError::Conflict {
                        path: path.clone(),
                        reason: "value differs from recorded old value".into(),
                    });
                }
                *target = new.clone();
            }
            Self::InsertKey {
                path,
                index,
                key,
                value,
            } => {
                let map = object_at(doc, path)?;
                if map.contains_key(key) {
                    return Err(DeltaError::Conflict {
                        path: child_path(path, PathSegment::Key(key.clone())),
                        reason: "key already present".into(),
                    });
                }
                insert_key_at(map, *index, key.clone(), value.clone());
            }
            Self::RemoveKey { path, key, value, .. } => {
                let map = object_at(doc, path)?;
                match map.get(key) {
                    Some(existing) if existing == value => {
                        let _ = remove_key_ordered(map, key);
                    }
                    Some(_) => {
                        return Err(DeltaError::Conflict {
                            path: child_path(path, PathSegment::Key(key.clone())),
                            reason: "value differs from recorded removed value".into(),
                        });
                    }
                    None => {
                        return Err(DeltaError::PathNotFound {
                            path: child_path(path, PathSegment::Key(key.clone())),
                        });
                    }
                }
            }
            Self::InsertItem { path, index, value } => {
                let items = array_at(doc, path)?;
                if *index > items.len() {
                    return Err(DeltaError::PathNotFound {
                        path: child_path(path, PathSegment::Index(*index)),
                    });
                }
                items.insert(*index, value.clone());
            }
            Self::RemoveItem { path, index, value } => {
                let items = array_at(doc, path)?;
                match items.get(*index) {
                    Some(existing) if existing == value => {
                        let _ = items.remove(*index);
                    }
                    Some(_) => {
                        return Err(DeltaError::Conflict {
                            path: child_path(path, PathSegment::Index(*index)),
                            reason: "element differs from recorded removed value".into(),
                        });
                    }
                    None => {
                        return Err(DeltaError::PathNotFound {
                            path: child_path(path, PathSegment::Index(*index)),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// An ordered list of [`DeltaOp`]s turning one document into another.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta {
    ops: Vec<DeltaOp>,
}

impl Delta {
    /// Compute the delta that turns `from` into `to`.
    ///
    /// Returns an empty delta when the values are equal.
    pub fn diff(from: &Value, to: &Value) -> Self {
        let mut ops = Vec::new();
        let mut path = Vec::new();
        diff_at(&mut ops, &mut path, from, to);
        Self { ops }
    }

    /// Build a delta from raw operations.
    pub fn from_ops(ops: Vec<DeltaOp>) -> Self {
        Self { ops }
    }

    /// Whether the delta changes nothing.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// The operations in application order.
    pub fn ops(&self) -> &[DeltaOp] {
        &self.ops
    }

    /// The delta that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            ops: self.ops.iter().rev().map(DeltaOp::inverse).collect(),
        }
    }

    /// Apply the delta to `doc` in place.
    ///
    /// On error `doc` may be partially patched; apply to a copy when the
    /// original must survive a failure.
    pub fn apply(&self, doc: &mut Value) -> Result<(), DeltaError> {
        for op in &self.ops {
            op.apply(doc)?;
        }
        Ok(())
    }

    /// Revert the delta on `doc` in place.
    ///
    /// Same partial-failure caveat as [`Delta::apply`].
    pub fn unapply(&self, doc: &mut Value) -> Result<(), DeltaError> {
        for op in self.ops.iter().rev() {
            op.inverse().apply(doc)?;
        }
        Ok(())
    }
}

// ── Diff ────────────────────────────────────────────────────────────────────

fn diff_at(ops: &mut Vec<DeltaOp>, path: &mut Vec<PathSegment>, from: &Value, to: &Value) {
    if from == to {
        return;
    }
    match (from, to) {
        (Value::Object(src), Value::Object(dst)) => diff_object(ops, path, src, dst),
        (Value::Array(src), Value::Array(dst)) => diff_array(ops, path, src, dst),
        _ => ops.push(DeltaOp::Replace {
            path: path.clone(),
            old: from.clone(),
            new: to.clone(),
        }),
    }
}

fn diff_object(
    ops: &mut Vec<DeltaOp>,
    path: &mut Vec<PathSegment>,
    src: &Map<String, Value>,
    dst: &Map<String, Value>,
) {
    // Key order as it evolves while the ops run.
    let mut order: Vec<&str> = src.keys().map(String::as_str).collect();

    for (key, value) in src {
        if dst.contains_key(key) {
            continue;
        }
        let index = order.iter().position(|k| *k == key).unwrap_or(order.len());
        let _ = order.remove(index);
        ops.push(DeltaOp::RemoveKey {
            path: path.clone(),
            index,
            key: key.clone(),
            value: value.clone(),
        });
    }

    for (index, (key, dst_value)) in dst.iter().enumerate() {
        match src.get(key) {
            Some(src_value) => {
                path.push(PathSegment::Key(key.clone()));
                diff_at(ops, path, src_value, dst_value);
                let _ = path.pop();
            }
            None => {
                let index = index.min(order.len());
                order.insert(index, key.as_str());
                ops.push(DeltaOp::InsertKey {
                    path: path.clone(),
                    index,
                    key: key.clone(),
                    value: dst_value.clone(),
                });
            }
        }
    }
}

/// Alignment step between two arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Equal,
    Delete(usize),
    Insert(usize),
}

fn diff_array(ops: &mut Vec<DeltaOp>, path: &mut Vec<PathSegment>, src: &[Value], dst: &[Value]) {
    let prefix = src
        .iter()
        .zip(dst)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = src[prefix..]
        .iter()
        .rev()
        .zip(dst[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let src_mid = &src[prefix..src.len() - suffix];
    let dst_mid = &dst[prefix..dst.len() - suffix];

    let steps = if src_mid.len().saturating_mul(dst_mid.len()) <= MAX_LCS_CELLS {
        lcs_steps(src_mid, dst_mid)
    } else {
        positional_steps(src_mid.len(), dst_mid.len())
    };

    let mut cursor = prefix;
    let mut deletes: Vec<usize> = Vec::new();
    let mut inserts: Vec<usize> = Vec::new();

    for step in steps {
        match step {
            Step::Equal => {
                cursor = emit_run(ops, path, cursor, src_mid, dst_mid, &deletes, &inserts);
                deletes.clear();
                inserts.clear();
                cursor += 1;
            }
            Step::Delete(i) => deletes.push(i),
            Step::Insert(j) => inserts.push(j),
        }
    }
    let _ = emit_run(ops, path, cursor, src_mid, dst_mid, &deletes, &inserts);
}

/// Emit ops for one run of deletions and insertions between two equal
/// elements. Returns the cursor position after the run.
fn emit_run(
    ops: &mut Vec<DeltaOp>,
    path: &mut Vec<PathSegment>,
    mut cursor: usize,
    src: &[Value],
    dst: &[Value],
    deletes: &[usize],
    inserts: &[usize],
) -> usize {
    let paired = deletes.len().min(inserts.len());

    for (&i, &j) in deletes.iter().zip(inserts).take(paired) {
        path.push(PathSegment::Index(cursor));
        diff_at(ops, path, &src[i], &dst[j]);
        let _ = path.pop();
        cursor += 1;
    }
    for &i in &deletes[paired..] {
        ops.push(DeltaOp::RemoveItem {
            path: path.clone(),
            index: cursor,
            value: src[i].clone(),
        });
    }
    for &j in &inserts[paired..] {
        ops.push(DeltaOp::InsertItem {
            path: path.clone(),
            index: cursor,
            value: dst[j].clone(),
        });
        cursor += 1;
    }
    cursor
}

/// LCS alignment over element equality.
fn lcs_steps(src: &[Value], dst: &[Value]) -> Vec<Step> {
    let (n, m) = (src.len(), dst.len());
    let mut table = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if src[i] == dst[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && src[i] == dst[j] {
            steps.push(Step::Equal);
            i += 1;
            j += 1;
        } else if i < n && (j == m || table[i + 1][j] >= table[i][j + 1]) {
            steps.push(Step::Delete(i));
            i += 1;
        } else {
            steps.push(Step::Insert(j));
            j += 1;
        }
    }
    steps
}

/// Index-by-index alignment for arrays too large for the LCS table.
fn positional_steps(n: usize, m: usize) -> Vec<Step> {
    (0..n)
        .map(Step::Delete)
        .chain((0..m).map(Step::Insert))
        .collect()
}

// ── Patch helpers ───────────────────────────────────────────────────────────

fn child_path(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut out = path.to_vec();
    out.push(segment);
    out
}

fn resolve_mut<'a>(doc: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Value, DeltaError> {
    let mut current = doc;
    for (depth, segment) in path.iter().enumerate() {
        let next = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get_mut(*index),
            _ => None,
        };
        current = next.ok_or_else(|| DeltaError::PathNotFound {
            path: path[..=depth].to_vec(),
        })?;
    }
    Ok(current)
}

fn object_at<'a>(
    doc: &'a mut Value,
    path: &[PathSegment],
) -> Result<&'a mut Map<String, Value>, DeltaError> {
    match resolve_mut(doc, path)? {
        Value::Object(map) => Ok(map),
        _ => Err(DeltaError::TypeMismatch {
            path: path.to_vec(),
            expected: "object",
        }),
    }
}

fn array_at<'a>(doc: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Vec<Value>, DeltaError> {
    match resolve_mut(doc, path)? {
        Value::Array(items) => Ok(items),
        _ => Err(DeltaError::TypeMismatch {
            path: path.to_vec(),
            expected: "array",
        }),
    }
}

/// Insert `key` at `index` without disturbing the order of the other keys.
fn insert_key_at(map: &mut Map<String, Value>, index: usize, key: String, value: Value) {
    let entries = std::mem::take(map);
    let mut pending = Some((key, value));
    for (position, (k, v)) in entries.into_iter().enumerate() {
        if position == index {
            if let Some((key, value)) = pending.take() {
                let _ = map.insert(key, value);
            }
        }
        let _ = map.insert(k, v);
    }
    if let Some((key, value)) = pending {
        let _ = map.insert(key, value);
    }
}

/// Remove `key` keeping the remaining keys in order.
fn remove_key_ordered(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    let entries = std::mem::take(map);
    let mut removed = None;
    for (k, v) in entries {
        if removed.is_none() && k == key {
            removed = Some(v);
        } else {
            let _ = map.insert(k, v);
        }
    }
    removed
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
