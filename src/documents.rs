//! The visible list of document keys (search results) and its focus.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentList {
    entries: Vec<String>,
    focused: Option<String>,
}

impl DocumentList {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries, focused: None }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Focus a listed key; unlisted keys clear the focus.
    pub fn focus(&mut self, key: Option<&str>) {
        self.focused = key.filter(|k| self.index_of(k).is_some()).map(String::from);
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e == key)
    }

    /// Insert at `index`, clamped to the list length. Listed keys are left alone.
    pub fn insert(&mut self, index: usize, key: &str) -> usize {
        if let Some(existing) = self.index_of(key) {
            return existing;
        }
        let index = index.min(self.entries.len());
        self.entries.insert(index, key.to_string());
        index
    }

    /// Remove a key, returning where it was listed.
    pub fn remove(&mut self, key: &str) -> Option<usize> {
        let index = self.index_of(key)?;
        self.entries.remove(index);
        if self.focused.as_deref() == Some(key) {
            self.focused = None;
        }
        Some(index)
    }

    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(index) = self.index_of(from) {
            self.entries[index] = to.to_string();
        }
        if self.focused.as_deref() == Some(from) {
            self.focused = Some(to.to_string());
        }
    }

    /// Swap in a new result set, keeping the focus when it survives.
    pub fn replace(&mut self, entries: Vec<String>) {
        self.entries = entries;
        let focused = self.focused.take();
        self.focus(focused.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> DocumentList {
        DocumentList::new(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    }

    #[test]
    fn test_insert_clamps_and_dedupes() {
        let mut list = list();
        assert_eq!(list.insert(10, "d"), 3);
        assert_eq!(list.insert(0, "b"), 1);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_remove_clears_focus() {
        let mut list = list();
        list.focus(Some("b"));

        assert_eq!(list.remove("b"), Some(1));
        assert_eq!(list.focused(), None);
        assert_eq!(list.remove("b"), None);
    }

    #[test]
    fn test_rename_follows_focus() {
        let mut list = list();
        list.focus(Some("c"));
        list.rename("c", "z");

        assert_eq!(list.entries(), &["a", "b", "z"]);
        assert_eq!(list.focused(), Some("z"));
    }

    #[test]
    fn test_replace_keeps_surviving_focus() {
        let mut list = list();
        list.focus(Some("a"));

        list.replace(vec!["a".to_string()]);
        assert_eq!(list.focused(), Some("a"));

        list.replace(vec!["b".to_string()]);
        assert_eq!(list.focused(), None);
    }

    #[test]
    fn test_focus_requires_listed_key() {
        let mut list = list();
        list.focus(Some("nope"));
        assert_eq!(list.focused(), None);
    }
}
