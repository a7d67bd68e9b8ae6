//! In-memory document store.
//!
//! Resolves every path across the prototype chain: the document itself is
//! the top layer, the document named by its `@inherit` child the next one,
//! and so on. A tombstone in a layer hides everything beneath it.

use std::collections::BTreeMap;
use std::ptr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{StoreError, StoreResult};
use super::models::{ClearOutcome, Part};
use super::path::PartPath;
use super::traits::{DocumentStore, SettingsStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    documents: Vec<Part>,
    #[serde(default)]
    settings: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store fixture: `{"documents": [...], "settings": {...}}`.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    fn document(&self, key: &str) -> Option<&Part> {
        self.documents.iter().find(|d| d.key == key)
    }

    fn document_mut(&mut self, key: &str) -> Option<&mut Part> {
        self.documents.iter_mut().find(|d| d.key == key)
    }

    /// `part` followed by the documents its prototype chain names.
    fn chain<'a>(&'a self, part: &'a Part, origin: Option<&'a str>) -> Vec<&'a Part> {
        let mut visited: Vec<&str> = origin.into_iter().collect();
        let mut chain = vec![part];
        let mut current = part;

        while let Some(prototype) = current.prototype() {
            if visited.contains(&prototype) {
                warn!(prototype = %prototype, "Prototype cycle, chain truncated");
                break;
            }
            let Some(doc) = self.document(prototype) else {
                debug!(prototype = %prototype, "Prototype document missing");
                break;
            };
            visited.push(prototype);
            chain.push(doc);
            current = doc;
        }

        chain
    }

    /// Parts that define `path`, top layer first.
    fn layers(&self, path: &PartPath) -> Vec<&Part> {
        let Some(doc) = self.document(path.document_key()) else {
            return Vec::new();
        };

        let mut layers = self.chain(doc, Some(doc.key.as_str()));
        for key in path.relative() {
            let mut next: Vec<&Part> = Vec::new();
            for layer in &layers {
                match layer.child(key) {
                    Some(child) if child.removed => break,
                    Some(child) => {
                        for part in self.chain(child, None) {
                            if !next.iter().any(|p| ptr::eq(*p, part)) {
                                next.push(part);
                            }
                        }
                    }
                    None => {}
                }
            }
            if next.is_empty() {
                return next;
            }
            layers = next;
        }

        layers
    }

    /// Live part of the top layer at `path`.
    fn local(&self, path: &PartPath) -> Option<&Part> {
        let mut part = self.document(path.document_key())?;
        for key in path.relative() {
            part = part.child(key)?;
        }
        Some(part).filter(|p| !p.removed)
    }

    fn local_mut(&mut self, path: &PartPath) -> Option<&mut Part> {
        let mut part = self.document_mut(path.document_key())?;
        for key in path.relative() {
            part = part.child_mut(key)?;
        }
        Some(part)
    }

    /// Top-layer part at `path`, creating live parts along the way.
    fn local_or_create(&mut self, path: &PartPath) -> StoreResult<&mut Part> {
        let doc_key = path.document_key().to_string();
        let mut part =
            self.document_mut(&doc_key).ok_or(StoreError::DocumentNotFound(doc_key))?;

        for key in path.relative() {
            let index = match part.children.iter().position(|c| &c.key == key) {
                Some(index) => index,
                None => {
                    part.children.push(Part::new(key.clone()));
                    part.children.len() - 1
                }
            };
            part = &mut part.children[index];
            part.revive();
        }

        Ok(part)
    }
}

impl SettingsStore for MemoryStore {
    fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).cloned()
    }

    fn put_setting(&mut self, key: &str, value: String) {
        self.settings.insert(key.to_string(), value);
    }
}

impl DocumentStore for MemoryStore {
    fn documents(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.key.clone()).collect()
    }

    fn contains_document(&self, key: &str) -> bool {
        self.document(key).is_some()
    }

    fn create_document(&mut self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidPath("Empty document key".to_string()));
        }
        if self.contains_document(key) {
            return Err(StoreError::DocumentExists(key.to_string()));
        }

        self.documents.push(Part::new(key));
        debug!(doc = %key, "Document created");
        Ok(())
    }

    fn delete_document(&mut self, key: &str) -> StoreResult<Part> {
        let index = self
            .documents
            .iter()
            .position(|d| d.key == key)
            .ok_or_else(|| StoreError::DocumentNotFound(key.to_string()))?;

        debug!(doc = %key, "Document deleted");
        Ok(self.documents.remove(index))
    }

    fn snapshot(&self, key: &str) -> Option<Part> {
        self.document(key).cloned()
    }

    fn restore_document(&mut self, part: Part, position: usize) -> StoreResult<()> {
        if self.contains_document(&part.key) {
            return Err(StoreError::DocumentExists(part.key));
        }

        let position = position.min(self.documents.len());
        debug!(doc = %part.key, position, "Document restored");
        self.documents.insert(position, part);
        Ok(())
    }

    fn rename_document(&mut self, from: &str, to: &str) -> StoreResult<()> {
        if from == to {
            return Ok(());
        }
        if to.is_empty() {
            return Err(StoreError::InvalidPath("Empty document key".to_string()));
        }
        if self.contains_document(to) {
            return Err(StoreError::DocumentExists(to.to_string()));
        }

        let doc =
            self.document_mut(from).ok_or_else(|| StoreError::DocumentNotFound(from.to_string()))?;
        doc.key = to.to_string();
        debug!(from = %from, to = %to, "Document renamed");
        Ok(())
    }

    fn exists(&self, path: &PartPath) -> bool {
        !self.layers(path).is_empty()
    }

    fn get(&self, path: &PartPath) -> Option<String> {
        self.layers(path).into_iter().find_map(|p| p.value.clone())
    }

    fn local_value(&self, path: &PartPath) -> Option<String> {
        self.local(path).and_then(|p| p.value.clone())
    }

    fn inherited_value(&self, path: &PartPath) -> Option<String> {
        let skip = usize::from(self.local(path).is_some());
        self.layers(path).into_iter().skip(skip).find_map(|p| p.value.clone())
    }

    fn is_top_layer(&self, path: &PartPath) -> bool {
        self.local(path).is_some()
    }

    fn has_inherited(&self, path: &PartPath) -> bool {
        self.layers(path).len() > usize::from(self.local(path).is_some())
    }

    fn children(&self, path: &PartPath) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();

        for layer in self.layers(path).iter().rev() {
            for child in &layer.children {
                if child.removed {
                    keys.retain(|k| k != &child.key);
                } else if !keys.contains(&child.key) {
                    keys.push(child.key.clone());
                }
            }
        }

        keys
    }

    fn set(&mut self, path: &PartPath, value: &str) -> StoreResult<()> {
        let part = self.local_or_create(path)?;
        part.value = Some(value.to_string());
        debug!(path = %path, value = %value, "Value set");
        Ok(())
    }

    fn create(&mut self, path: &PartPath) -> StoreResult<()> {
        self.local_or_create(path)?;
        Ok(())
    }

    fn clear(&mut self, path: &PartPath) -> StoreResult<ClearOutcome> {
        let Some(parent_path) = path.parent() else {
            return Err(StoreError::InvalidPath(format!("Cannot clear document root: {}", path)));
        };
        let key = path.last().to_string();

        if self.local(path).is_some() {
            if let Some(parent) = self.local_mut(&parent_path) {
                parent.children.retain(|c| c.key != key);
            }
            let outcome =
                if self.exists(path) { ClearOutcome::Revealed } else { ClearOutcome::Removed };
            debug!(path = %path, outcome = ?outcome, "Top-layer definition cleared");
            return Ok(outcome);
        }

        if !self.exists(path) {
            return Err(StoreError::PathNotFound(path.to_string()));
        }

        let parent = self.local_or_create(&parent_path)?;
        match parent.children.iter().position(|c| c.key == key) {
            Some(index) => parent.children[index] = Part::tombstone(key),
            None => parent.children.push(Part::tombstone(key)),
        }
        debug!(path = %path, "Inherited definition hidden");
        Ok(ClearOutcome::Removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::INHERIT_KEY;

    fn path(p: &str) -> PartPath {
        PartPath::parse(p).unwrap()
    }

    /// `furniture` defines legs=4 and width=2; `chair` inherits it and overrides width.
    fn layered_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_document("furniture").unwrap();
        store.set(&path("furniture/legs"), "4").unwrap();
        store.set(&path("furniture/width"), "2").unwrap();
        store.create_document("chair").unwrap();
        store.set(&path("chair/@inherit"), "furniture").unwrap();
        store.set(&path("chair/width"), "5").unwrap();
        store
    }

    #[test]
    fn test_inherited_value_resolution() {
        let store = layered_store();

        assert_eq!(store.get(&path("chair/legs")), Some("4".to_string()));
        assert!(!store.is_top_layer(&path("chair/legs")));
        assert_eq!(store.local_value(&path("chair/legs")), None);
    }

    #[test]
    fn test_override_shadows_prototype() {
        let store = layered_store();

        assert_eq!(store.get(&path("chair/width")), Some("5".to_string()));
        assert_eq!(store.inherited_value(&path("chair/width")), Some("2".to_string()));
        assert!(store.is_top_layer(&path("chair/width")));
    }

    #[test]
    fn test_children_merge_base_first() {
        let store = layered_store();

        assert_eq!(store.children(&path("chair")), vec!["legs", "width", INHERIT_KEY]);
    }

    #[test]
    fn test_clear_reveals_inherited_value() {
        let mut store = layered_store();

        let outcome = store.clear(&path("chair/width")).unwrap();
        assert_eq!(outcome, ClearOutcome::Revealed);
        assert_eq!(store.get(&path("chair/width")), Some("2".to_string()));
        assert!(!store.is_top_layer(&path("chair/width")));
    }

    #[test]
    fn test_clear_inherited_writes_tombstone() {
        let mut store = layered_store();

        let outcome = store.clear(&path("chair/legs")).unwrap();
        assert_eq!(outcome, ClearOutcome::Removed);
        assert!(!store.exists(&path("chair/legs")));
        assert!(!store.children(&path("chair")).contains(&"legs".to_string()));
        assert!(store.exists(&path("furniture/legs")));
    }

    #[test]
    fn test_set_revives_tombstone() {
        let mut store = layered_store();
        store.clear(&path("chair/legs")).unwrap();

        store.set(&path("chair/legs"), "3").unwrap();
        assert_eq!(store.get(&path("chair/legs")), Some("3".to_string()));
        assert_eq!(store.inherited_value(&path("chair/legs")), Some("4".to_string()));
    }

    #[test]
    fn test_has_inherited_ignores_top_layer() {
        let mut store = layered_store();
        store.set(&path("chair/color"), "red").unwrap();

        assert!(store.has_inherited(&path("chair/width")));
        assert!(store.has_inherited(&path("chair/legs")));
        assert!(!store.has_inherited(&path("chair/color")));
        assert!(!store.has_inherited(&path("furniture/legs")));

        store.clear(&path("chair/legs")).unwrap();
        assert!(!store.has_inherited(&path("chair/legs")));
    }

    #[test]
    fn test_clear_local_only_removes() {
        let mut store = layered_store();
        store.set(&path("chair/color"), "red").unwrap();

        assert_eq!(store.clear(&path("chair/color")).unwrap(), ClearOutcome::Removed);
        assert!(!store.exists(&path("chair/color")));
    }

    #[test]
    fn test_clear_missing_path() {
        let mut store = layered_store();
        let result = store.clear(&path("chair/missing"));
        assert!(matches!(result, Err(StoreError::PathNotFound(_))));
    }

    #[test]
    fn test_clear_document_root_rejected() {
        let mut store = layered_store();
        assert!(matches!(store.clear(&path("chair")), Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn test_set_creates_local_ancestors() {
        let mut store = layered_store();
        store.set(&path("furniture/frame/material"), "oak").unwrap();
        assert!(!store.is_top_layer(&path("chair/frame")));

        store.set(&path("chair/frame/material"), "pine").unwrap();
        assert!(store.is_top_layer(&path("chair/frame")));
        assert_eq!(store.local_value(&path("chair/frame")), None);
    }

    #[test]
    fn test_nested_inherit_chain() {
        let mut store = layered_store();
        store.create_document("stool").unwrap();
        store.set(&path("stool/@inherit"), "chair").unwrap();

        assert_eq!(store.get(&path("stool/width")), Some("5".to_string()));
        assert_eq!(store.get(&path("stool/legs")), Some("4".to_string()));
    }

    #[test]
    fn test_prototype_cycle_is_truncated() {
        let mut store = MemoryStore::new();
        store.create_document("a").unwrap();
        store.create_document("b").unwrap();
        store.set(&path("a/@inherit"), "b").unwrap();
        store.set(&path("b/@inherit"), "a").unwrap();
        store.set(&path("b/x"), "1").unwrap();

        assert_eq!(store.get(&path("a/x")), Some("1".to_string()));
        assert_eq!(store.children(&path("a")), vec![INHERIT_KEY, "x"]);
    }

    #[test]
    fn test_delete_and_restore_document() {
        let mut store = layered_store();
        let before = store.clone();

        let part = store.delete_document("furniture").unwrap();
        assert!(!store.contains_document("furniture"));
        assert_eq!(store.get(&path("chair/legs")), None);

        store.restore_document(part, 0).unwrap();
        assert_eq!(store, before);
    }

    #[test]
    fn test_create_duplicate_document() {
        let mut store = layered_store();
        let result = store.create_document("chair");
        assert!(matches!(result, Err(StoreError::DocumentExists(_))));
    }

    #[test]
    fn test_rename_document() {
        let mut store = layered_store();
        store.rename_document("chair", "armchair").unwrap();

        assert!(store.contains_document("armchair"));
        assert!(!store.contains_document("chair"));
        assert_eq!(store.get(&path("armchair/width")), Some("5".to_string()));
    }

    #[test]
    fn test_rename_onto_existing_document() {
        let mut store = layered_store();
        let result = store.rename_document("chair", "furniture");
        assert!(matches!(result, Err(StoreError::DocumentExists(_))));
    }

    #[test]
    fn test_settings_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.setting("divider"), None);

        store.put_setting("divider", "0.4".to_string());
        assert_eq!(store.setting("divider"), Some("0.4".to_string()));
    }

    #[test]
    fn test_from_json_fixture() {
        let json = r#"{
            "documents": [
                { "key": "base", "children": [ { "key": "size", "value": "2" } ] },
                { "key": "item", "children": [ { "key": "@inherit", "value": "base" } ] }
            ],
            "settings": { "mru": "[\"item\"]" }
        }"#;

        let store = MemoryStore::from_json(json).unwrap();
        assert_eq!(store.documents(), vec!["base", "item"]);
        assert_eq!(store.get(&path("item/size")), Some("2".to_string()));
        assert_eq!(store.setting("mru"), Some("[\"item\"]".to_string()));
    }
}
