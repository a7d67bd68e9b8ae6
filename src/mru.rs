//! Most-recently-used document list, persisted as a store setting.

use tracing::{debug, warn};

use crate::store::SettingsStore;

pub const MRU_SETTING: &str = "mru";

/// Recently used document keys, newest first.
///
/// Keeps twice the display window so removing an entry can still fill the
/// window from older history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MruList {
    keys: Vec<String>,
    window: usize,
}

impl MruList {
    pub fn new(window: usize) -> Self {
        Self { keys: Vec::new(), window: window.max(1) }
    }

    /// Read the persisted list. A missing or unreadable setting starts empty.
    pub fn load<S: SettingsStore + ?Sized>(store: &S, window: usize) -> Self {
        let mut list = Self::new(window);
        if let Some(raw) = store.setting(MRU_SETTING) {
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(keys) => {
                    list.keys = keys;
                    list.keys.truncate(list.capacity());
                }
                Err(err) => warn!(error = %err, "Ignoring unreadable MRU setting"),
            }
        }
        list
    }

    pub fn capacity(&self) -> usize {
        self.window * 2
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Entries shown to the user.
    pub fn window(&self) -> &[String] {
        &self.keys[..self.keys.len().min(self.window)]
    }

    /// Record a newly created or restored document.
    pub fn insert_doc<S: SettingsStore + ?Sized>(&mut self, store: &mut S, key: &str) {
        self.promote(key);
        self.persist(store);
    }

    /// Record that a document was opened.
    pub fn use_doc<S: SettingsStore + ?Sized>(&mut self, store: &mut S, key: &str) {
        if self.keys.first().is_some_and(|k| k == key) {
            return;
        }
        self.promote(key);
        self.persist(store);
    }

    pub fn remove_doc<S: SettingsStore + ?Sized>(&mut self, store: &mut S, key: &str) {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        if self.keys.len() != before {
            self.persist(store);
        }
    }

    pub fn rename_doc<S: SettingsStore + ?Sized>(&mut self, store: &mut S, from: &str, to: &str) {
        let Some(position) = self.keys.iter().position(|k| k == from) else {
            return;
        };
        self.keys.retain(|k| k != to);
        let position = position.min(self.keys.len());
        match self.keys.iter().position(|k| k == from) {
            Some(current) => self.keys[current] = to.to_string(),
            None => self.keys.insert(position, to.to_string()),
        }
        self.persist(store);
    }

    fn promote(&mut self, key: &str) {
        self.keys.retain(|k| k != key);
        self.keys.insert(0, key.to_string());
        self.keys.truncate(self.capacity());
    }

    fn persist<S: SettingsStore + ?Sized>(&self, store: &mut S) {
        match serde_json::to_string(&self.keys) {
            Ok(json) => {
                debug!(entries = self.keys.len(), "MRU list saved");
                store.put_setting(MRU_SETTING, json);
            }
            Err(err) => warn!(error = %err, "Failed to serialize MRU list"),
        }
    }
}
