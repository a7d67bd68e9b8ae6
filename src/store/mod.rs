//! Document store seam and its in-memory implementation.

pub mod error;
pub mod memory;
pub mod models;
pub mod path;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{ANNOTATIONS_KEY, ClearOutcome, INHERIT_KEY, Part, REFERENCES_KEY};
pub use path::PartPath;
#[cfg(any(test, feature = "mockall"))]
pub use traits::MockSettingsStore;
pub use traits::{DocumentStore, SettingsStore};
