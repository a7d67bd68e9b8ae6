use chrono::{DateTime, Local, Utc};
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;
use tracing::warn;

use crate::error::EditorResult;
use crate::store::Part;

/// Everything needed to put a deleted document back where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedDocument {
    /// Local content at deletion time.
    pub snapshot: Part,
    /// Position in store order.
    pub store_position: usize,
    /// Position in the visible document list, if it was listed.
    pub list_index: Option<usize>,
    pub had_focus: bool,
}

impl DeletedDocument {
    pub fn key(&self) -> &str {
        &self.snapshot.key
    }
}

/// Document-level operations the edit log replays.
///
/// Implementations perform the change and notify views but never record it.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait EditTarget {
    fn has_document(&self, key: &str) -> bool;
    fn insert_document(&mut self, key: &str) -> EditorResult<()>;
    fn remove_document(&mut self, key: &str) -> EditorResult<()>;
    fn restore_document(&mut self, deleted: &DeletedDocument) -> EditorResult<()>;
    fn move_document(&mut self, from: &str, to: &str) -> EditorResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Create { key: String },
    Delete(DeletedDocument),
    Rename { before: String, after: String },
}

impl EditOp {
    /// A rename to the same key changes nothing and is never recorded.
    pub fn is_noop(&self) -> bool {
        matches!(self, EditOp::Rename { before, after } if before == after)
    }

    /// Whether this op cancels `previous` out entirely.
    pub fn annihilates(&self, previous: &EditOp) -> bool {
        match (previous, self) {
            (EditOp::Create { key }, EditOp::Delete(deleted)) => key == deleted.key(),
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            EditOp::Create { key } => format!("create {}", key),
            EditOp::Delete(deleted) => format!("delete {}", deleted.key()),
            EditOp::Rename { before, after } => format!("rename {} to {}", before, after),
        }
    }

    pub fn undo<T: EditTarget + ?Sized>(&self, target: &mut T) -> EditorResult<()> {
        match self {
            EditOp::Create { key } => {
                if !target.has_document(key) {
                    warn!(doc = %key, "Created document is gone, nothing to undo");
                    return Ok(());
                }
                target.remove_document(key)
            }
            EditOp::Delete(deleted) => {
                if target.has_document(deleted.key()) {
                    warn!(doc = %deleted.key(), "Deleted document exists again, nothing to undo");
                    return Ok(());
                }
                target.restore_document(deleted)
            }
            EditOp::Rename { before, after } => Self::rename(target, after, before),
        }
    }

    pub fn redo<T: EditTarget + ?Sized>(&self, target: &mut T) -> EditorResult<()> {
        match self {
            EditOp::Create { key } => {
                if target.has_document(key) {
                    warn!(doc = %key, "Document already exists, nothing to redo");
                    return Ok(());
                }
                target.insert_document(key)
            }
            EditOp::Delete(deleted) => {
                if !target.has_document(deleted.key()) {
                    warn!(doc = %deleted.key(), "Document is already gone, nothing to redo");
                    return Ok(());
                }
                target.remove_document(deleted.key())
            }
            EditOp::Rename { before, after } => Self::rename(target, before, after),
        }
    }

    fn rename<T: EditTarget + ?Sized>(target: &mut T, from: &str, to: &str) -> EditorResult<()> {
        if !target.has_document(from) || target.has_document(to) {
            warn!(from = %from, to = %to, "Rename no longer applies");
            return Ok(());
        }
        target.move_document(from, to)
    }
}

/// One recorded op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub op: EditOp,
    /// Cancelled by a neighbouring op; skipped by undo and redo.
    pub neutralized: bool,
    pub committed_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(op: EditOp) -> Self {
        Self { op, neutralized: false, committed_at: Utc::now() }
    }

    /// Op description stamped with its local commit time, e.g. `create a (14:02:11)`.
    pub fn describe(&self) -> String {
        let local = self.committed_at.with_timezone(&Local);
        format!("{} ({})", self.op.describe(), local.format("%H:%M:%S"))
    }
}
