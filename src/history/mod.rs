//! Undo/redo of document-level edits.

pub mod edit_log;
pub mod record;

pub use edit_log::{DEFAULT_HISTORY_LIMIT, EditLog};
#[cfg(any(test, feature = "mockall"))]
pub use record::MockEditTarget;
pub use record::{DeletedDocument, EditOp, EditTarget, LogEntry};
