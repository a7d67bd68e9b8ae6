use serde::{Deserialize, Serialize};

/// Key of the child that names a part's prototype document.
pub const INHERIT_KEY: &str = "@inherit";
/// Key of a part's annotation group.
pub const ANNOTATIONS_KEY: &str = "@annotations";
/// Key of a part's reference group.
pub const REFERENCES_KEY: &str = "@references";

/// One locally stored part of a document.
///
/// A `removed` part is a tombstone: it hides whatever the prototype layers
/// define under the same key and carries no value or children of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Part>,
}

impl Part {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), value: None, removed: false, children: Vec::new() }
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: Some(value.into()), removed: false, children: Vec::new() }
    }

    pub fn tombstone(key: impl Into<String>) -> Self {
        Self { key: key.into(), value: None, removed: true, children: Vec::new() }
    }

    pub fn child(&self, key: &str) -> Option<&Part> {
        self.children.iter().find(|c| c.key == key)
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut Part> {
        self.children.iter_mut().find(|c| c.key == key)
    }

    /// Prototype document named by a live `@inherit` child.
    pub fn prototype(&self) -> Option<&str> {
        self.child(INHERIT_KEY).filter(|c| !c.removed).and_then(|c| c.value.as_deref())
    }

    /// Turn a tombstone back into a live, empty part.
    pub(crate) fn revive(&mut self) {
        if self.removed {
            self.removed = false;
            self.value = None;
            self.children.clear();
        }
    }
}

/// Outcome of clearing the top-layer definition of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The local definition is gone and an inherited one now shows through.
    Revealed,
    /// Nothing resolves the path any more.
    Removed,
}
