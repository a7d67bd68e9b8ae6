use tracing::debug;

use crate::error::EditorResult;

use super::record::{EditOp, EditTarget, LogEntry};

pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Linear undo/redo log of document-level ops.
///
/// Entries before `cursor` are done, entries from `cursor` on are undone.
/// A delete that directly follows the create of the same document marks
/// both entries neutralized so that neither undo nor redo touches them.
#[derive(Debug, Clone)]
pub struct EditLog {
    entries: Vec<LogEntry>,
    cursor: usize,
    limit: usize,
}

impl Default for EditLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl EditLog {
    pub fn new(limit: usize) -> Self {
        Self { entries: Vec::new(), cursor: 0, limit: limit.max(1) }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Record a completed op, dropping anything that was undone.
    ///
    /// Returns `false` when the op was a no-op and nothing was recorded.
    pub fn push(&mut self, op: EditOp) -> bool {
        if op.is_noop() {
            debug!(op = %op.describe(), "Skipping no-op edit");
            return false;
        }

        self.entries.truncate(self.cursor);
        let mut entry = LogEntry::new(op);
        if let Some(previous) = self.entries.last_mut()
            && !previous.neutralized
            && entry.op.annihilates(&previous.op)
        {
            previous.neutralized = true;
            entry.neutralized = true;
            debug!(op = %entry.op.describe(), "Edit cancels the previous one");
        }
        self.entries.push(entry);

        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len();
        true
    }

    /// Revert the newest live op. Returns `false` when there is none.
    pub fn undo<T: EditTarget + ?Sized>(&mut self, target: &mut T) -> EditorResult<bool> {
        let Some(position) = self.undo_position() else {
            return Ok(false);
        };
        let entry = &self.entries[position];
        entry.op.undo(target)?;
        debug!(op = %entry.op.describe(), committed_at = %entry.committed_at, "Undone");
        self.cursor = position;
        Ok(true)
    }

    /// Reapply the oldest undone live op. Returns `false` when there is none.
    pub fn redo<T: EditTarget + ?Sized>(&mut self, target: &mut T) -> EditorResult<bool> {
        let Some(position) = self.redo_position() else {
            return Ok(false);
        };
        let entry = &self.entries[position];
        entry.op.redo(target)?;
        debug!(op = %entry.op.describe(), committed_at = %entry.committed_at, "Redone");
        self.cursor = position + 1;
        Ok(true)
    }

    /// Entry the next `undo` would revert.
    pub fn next_undo(&self) -> Option<&LogEntry> {
        self.undo_position().map(|p| &self.entries[p])
    }

    /// Entry the next `redo` would reapply.
    pub fn next_redo(&self) -> Option<&LogEntry> {
        self.redo_position().map(|p| &self.entries[p])
    }

    pub fn can_undo(&self) -> bool {
        self.undo_position().is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.redo_position().is_some()
    }

    fn undo_position(&self) -> Option<usize> {
        (0..self.cursor).rev().find(|&p| !self.entries[p].neutralized)
    }

    fn redo_position(&self) -> Option<usize> {
        (self.cursor..self.entries.len()).find(|&p| !self.entries[p].neutralized)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{DeletedDocument, MockEditTarget};
    use crate::store::Part;

    fn create(key: &str) -> EditOp {
        EditOp::Create { key: key.to_string() }
    }

    fn delete(key: &str) -> EditOp {
        EditOp::Delete(DeletedDocument {
            snapshot: Part::new(key),
            store_position: 0,
            list_index: None,
            had_focus: false,
        })
    }

    #[test]
    fn test_create_then_delete_annihilates() {
        let mut log = EditLog::default();
        log.push(create("x"));
        log.push(delete("x"));

        assert_eq!(log.len(), 2);
        assert!(log.entries().iter().all(|e| e.neutralized));
        assert!(!log.can_undo());

        let mut target = MockEditTarget::new();
        target.expect_has_document().never();
        assert!(!log.undo(&mut target).unwrap());
        assert!(!log.redo(&mut target).unwrap());
    }

    #[test]
    fn test_annihilation_needs_matching_key() {
        let mut log = EditLog::default();
        log.push(create("x"));
        log.push(delete("y"));

        assert!(log.entries().iter().all(|e| !e.neutralized));
    }

    #[test]
    fn test_neutralized_create_is_not_reused() {
        let mut log = EditLog::default();
        log.push(create("x"));
        log.push(delete("x"));
        log.push(delete("x"));

        assert!(!log.entries()[2].neutralized);
        assert!(log.can_undo());
    }

    #[test]
    fn test_rename_noop_is_skipped() {
        let mut log = EditLog::default();
        assert!(!log.push(EditOp::Rename { before: "a".to_string(), after: "a".to_string() }));
        assert!(log.is_empty());
    }

    #[test]
    fn test_undo_skips_neutralized_entries() {
        let mut log = EditLog::default();
        log.push(create("a"));
        log.push(create("x"));
        log.push(delete("x"));

        let mut target = MockEditTarget::new();
        target.expect_has_document().withf(|key| key == "a").return_const(true);
        target.expect_remove_document().withf(|key| key == "a").times(1).returning(|_| Ok(()));

        assert!(log.undo(&mut target).unwrap());
        assert_eq!(log.cursor(), 0);
        assert!(!log.can_undo());
        assert!(log.can_redo());
    }

    #[test]
    fn test_push_truncates_redo_tail() {
        let mut log = EditLog::default();
        log.push(create("a"));

        let mut target = MockEditTarget::new();
        target.expect_has_document().return_const(true);
        target.expect_remove_document().returning(|_| Ok(()));
        log.undo(&mut target).unwrap();

        log.push(create("b"));
        assert_eq!(log.len(), 1);
        assert!(!log.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut log = EditLog::new(2);
        log.push(create("a"));
        log.push(create("b"));
        log.push(create("c"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].op, create("b"));
        assert_eq!(log.cursor(), 2);
    }

    #[test]
    fn test_next_undo_and_redo_skip_neutralized() {
        let mut log = EditLog::default();
        log.push(create("a"));
        log.push(create("b"));
        log.push(delete("b"));

        assert_eq!(log.next_undo().map(|e| &e.op), Some(&create("a")));
        assert!(log.next_redo().is_none());

        let mut target = MockEditTarget::new();
        target.expect_has_document().return_const(true);
        target.expect_remove_document().times(1).returning(|_| Ok(()));
        assert!(log.undo(&mut target).unwrap());

        assert!(log.next_undo().is_none());
        assert_eq!(log.next_redo().map(|e| &e.op), Some(&create("a")));
    }
}
