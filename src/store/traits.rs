#[cfg(any(test, feature = "mockall"))]
use mockall::automock;

use super::error::StoreResult;
use super::models::{ClearOutcome, Part};
use super::path::PartPath;

/// Opaque key/value settings kept next to the documents.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait SettingsStore {
    fn setting(&self, key: &str) -> Option<String>;
    fn put_setting(&mut self, key: &str, value: String);
}

/// Named hierarchical documents whose parts inherit from prototype documents.
///
/// Every read resolves the prototype chain; every write lands in the top
/// layer, the document addressed by the path itself.
pub trait DocumentStore: SettingsStore {
    /// Document keys in store order.
    fn documents(&self) -> Vec<String>;
    fn contains_document(&self, key: &str) -> bool;
    fn create_document(&mut self, key: &str) -> StoreResult<()>;
    /// Remove a document, returning its local content.
    fn delete_document(&mut self, key: &str) -> StoreResult<Part>;
    /// Local content of a document, independent of later edits.
    fn snapshot(&self, key: &str) -> Option<Part>;
    /// Put a previously deleted document back at `position` in store order.
    fn restore_document(&mut self, part: Part, position: usize) -> StoreResult<()>;
    fn rename_document(&mut self, from: &str, to: &str) -> StoreResult<()>;

    /// Whether any layer resolves the path.
    fn exists(&self, path: &PartPath) -> bool;
    /// Effective value after prototype resolution.
    fn get(&self, path: &PartPath) -> Option<String>;
    /// Value defined in the top layer only.
    fn local_value(&self, path: &PartPath) -> Option<String>;
    /// Value the prototype layers would supply without the top layer.
    fn inherited_value(&self, path: &PartPath) -> Option<String>;
    fn is_top_layer(&self, path: &PartPath) -> bool;
    /// Whether a layer below the top one resolves the path.
    fn has_inherited(&self, path: &PartPath) -> bool;
    /// Merged child keys, base layers first.
    fn children(&self, path: &PartPath) -> Vec<String>;

    fn set(&mut self, path: &PartPath, value: &str) -> StoreResult<()>;
    /// Define the path in the top layer without giving it a value.
    fn create(&mut self, path: &PartPath) -> StoreResult<()>;
    /// Drop the top-layer definition of the path.
    fn clear(&mut self, path: &PartPath) -> StoreResult<ClearOutcome>;
}
