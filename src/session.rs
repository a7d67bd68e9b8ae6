//! Editing session: one store, at most one open document, and everything
//! the views around it share.

use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::cursor::PathCursor;
use crate::documents::DocumentList;
use crate::error::{EditorError, EditorResult};
use crate::events::{ViewEvent, ViewListener};
use crate::filter::{FilterLevel, FilteredIndex};
use crate::history::{DeletedDocument, EditLog, EditOp, EditTarget};
use crate::mru::MruList;
use crate::overlay::{AddRequest, EditContext, NodeId, OverlayTree};
use crate::search::{SearchResults, SearchWorker};
use crate::store::{DocumentStore, INHERIT_KEY, PartPath, StoreError};

pub const DIVIDER_SETTING: &str = "divider";

pub struct Session<S: DocumentStore> {
    store: S,
    config: SessionConfig,
    level: FilterLevel,
    tree: Option<OverlayTree>,
    events: Vec<ViewEvent>,
    history: EditLog,
    mru: MruList,
    documents: DocumentList,
}

impl<S: DocumentStore> Session<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        let mru = MruList::load(&store, config.mru_window);
        let documents = DocumentList::new(store.documents());
        Self {
            level: config.default_level,
            history: EditLog::new(config.history_limit),
            store,
            config,
            tree: None,
            events: Vec::new(),
            mru,
            documents,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn level(&self) -> FilterLevel {
        self.level
    }

    pub fn tree(&self) -> Option<&OverlayTree> {
        self.tree.as_ref()
    }

    pub fn history(&self) -> &EditLog {
        &self.history
    }

    pub fn mru(&self) -> &MruList {
        &self.mru
    }

    pub fn documents(&self) -> &DocumentList {
        &self.documents
    }

    /// Node at a `/`-separated key path below the open document's root.
    pub fn lookup(&self, relative: &str) -> Option<NodeId> {
        let tree = self.tree.as_ref()?;
        relative
            .split('/')
            .filter(|k| !k.is_empty())
            .try_fold(tree.root(), |id, key| tree.child_by_key(id, key))
    }

    pub fn open(&mut self, key: &str) -> EditorResult<()> {
        let mut tree = OverlayTree::load(&self.store, key)?;
        FilteredIndex::new(&mut tree, self.level).set_level();
        self.tree = Some(tree);
        self.events.push(ViewEvent::Reloaded);

        self.mru.use_doc(&mut self.store, key);
        self.documents.focus(Some(key));
        info!(doc = %key, level = %self.level, "Document opened");
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(tree) = self.tree.take() {
            debug!(doc = %tree.document_key(), "Document closed");
            self.events.push(ViewEvent::Reloaded);
        }
    }

    /// Refilter the open tree, keeping the selection on the same path.
    pub fn set_level(&mut self, level: FilterLevel) -> EditorResult<()> {
        if level == self.level {
            return Ok(());
        }
        self.level = level;

        if let Some(tree) = self.tree.as_mut() {
            let cursor = PathCursor::capture(tree);
            FilteredIndex::new(tree, level).set_level();
            if let Some(cursor) = cursor {
                cursor.restore(tree, level)?;
            }
            self.events.push(ViewEvent::Reloaded);
        }
        info!(level = %level, "Filter level changed");
        Ok(())
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.tree.as_ref().and_then(OverlayTree::selection)
    }

    pub fn select(&mut self, node: Option<NodeId>) -> EditorResult<()> {
        self.tree_mut()?.set_selection(node)
    }

    pub fn set_expanded(&mut self, node: NodeId, expanded: bool) -> EditorResult<()> {
        self.tree_mut()?.set_expanded(node, expanded)
    }

    pub fn toggle_expanded(&mut self, node: NodeId) -> EditorResult<bool> {
        let tree = self.tree_mut()?;
        let expanded = !tree.get(node)?.expanded;
        tree.set_expanded(node, expanded)?;
        Ok(expanded)
    }

    /// Add below `target` and select what was added.
    pub fn add(&mut self, target: NodeId, request: AddRequest) -> EditorResult<Option<NodeId>> {
        let added = self.with_context(|ctx, selection| ctx.add(target, request, selection))?;
        if let Some(id) = added {
            self.select(Some(id))?;
        }
        Ok(added)
    }

    pub fn apply_edit(&mut self, node: NodeId, text: &str) -> EditorResult<NodeId> {
        let shown = self.with_context(|ctx, _| ctx.apply_edit(node, text))?;
        if self.tree.as_ref().is_some_and(|t| t.contains(shown)) {
            self.select(Some(shown))?;
        }
        Ok(shown)
    }

    /// Delete a node. Deleting the root deletes the whole document.
    pub fn delete(&mut self, node: NodeId) -> EditorResult<()> {
        let tree = self.tree.as_ref().ok_or(EditorError::NoOpenDocument)?;
        if node == tree.root() {
            let key = tree.document_key().to_string();
            return self.delete_document(&key);
        }
        self.with_context(|ctx, _| ctx.delete(node))
    }

    pub fn create_document(&mut self, key: &str) -> EditorResult<()> {
        self.insert_document(key)?;
        self.history.push(EditOp::Create { key: key.to_string() });
        Ok(())
    }

    pub fn delete_document(&mut self, key: &str) -> EditorResult<()> {
        let deleted = self.take_document(key)?;
        self.history.push(EditOp::Delete(deleted));
        Ok(())
    }

    /// Returns `false` when `from` and `to` are the same key.
    pub fn rename_document(&mut self, from: &str, to: &str) -> EditorResult<bool> {
        if from == to {
            debug!(doc = %from, "Rename to the same key ignored");
            return Ok(false);
        }
        self.move_document(from, to)?;
        self.history.push(EditOp::Rename { before: from.to_string(), after: to.to_string() });
        Ok(true)
    }

    pub fn undo(&mut self) -> EditorResult<bool> {
        let mut history = std::mem::take(&mut self.history);
        let result = history.undo(self);
        self.history = history;
        result
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        let mut history = std::mem::take(&mut self.history);
        let result = history.redo(self);
        self.history = history;
        result
    }

    /// Show a finished search, unless a newer one superseded it.
    pub fn apply_search_results(&mut self, results: SearchResults, worker: &SearchWorker) {
        if !worker.is_current(&results) {
            debug!(generation = results.generation, "Dropping stale search results");
            return;
        }
        debug!(query = %results.query, matches = results.matches.len(), "Search results shown");
        self.documents.replace(results.matches);
    }

    pub fn set_divider_position(&mut self, position: f64) {
        self.store.put_setting(DIVIDER_SETTING, position.to_string());
    }

    pub fn divider_position(&self) -> Option<f64> {
        let raw = self.store.setting(DIVIDER_SETTING)?;
        match raw.parse() {
            Ok(position) => Some(position),
            Err(err) => {
                warn!(value = %raw, error = %err, "Ignoring unreadable divider setting");
                None
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }

    /// Deliver and clear all pending events.
    pub fn dispatch(&mut self, listener: &mut dyn ViewListener) {
        for event in self.drain_events() {
            event.deliver(listener);
        }
    }

    fn tree_mut(&mut self) -> EditorResult<&mut OverlayTree> {
        self.tree.as_mut().ok_or(EditorError::NoOpenDocument)
    }

    /// Run a tree edit, then put the selection back on its path if the edit
    /// freed or hid the selected node.
    fn with_context<T>(
        &mut self,
        edit: impl FnOnce(&mut EditContext<'_, S>, Option<NodeId>) -> EditorResult<T>,
    ) -> EditorResult<T> {
        let level = self.level;
        let tree = self.tree.as_mut().ok_or(EditorError::NoOpenDocument)?;
        let selection = tree.selection();
        let cursor = PathCursor::capture(tree);

        let result = {
            let mut ctx = EditContext::new(&mut self.store, tree, level, &mut self.events);
            edit(&mut ctx, selection)
        };

        let root = tree.root();
        let stale = match tree.selection() {
            None => true,
            Some(id) => id != root && !tree.node(id).is_some_and(|n| n.visible(level)),
        };
        if stale && let Some(cursor) = cursor {
            cursor.restore(tree, level)?;
        }
        result
    }

    /// Rebuild the open tree from the store, keeping the selection path.
    fn reload(&mut self) -> EditorResult<()> {
        let Some(tree) = self.tree.as_ref() else {
            return Ok(());
        };
        let key = tree.document_key().to_string();
        let cursor = PathCursor::capture(tree);

        let mut fresh = OverlayTree::load(&self.store, &key)?;
        FilteredIndex::new(&mut fresh, self.level).set_level();
        if let Some(cursor) = cursor {
            cursor.restore(&mut fresh, self.level)?;
        }
        self.tree = Some(fresh);
        self.events.push(ViewEvent::Reloaded);
        debug!(doc = %key, "Open document reloaded");
        Ok(())
    }

    fn take_document(&mut self, key: &str) -> EditorResult<DeletedDocument> {
        let store_position = self
            .store
            .documents()
            .iter()
            .position(|d| d == key)
            .ok_or_else(|| StoreError::DocumentNotFound(key.to_string()))?;
        let list_index = self.documents.index_of(key);
        let had_focus = self.documents.focused() == Some(key);

        let snapshot = self.store.delete_document(key)?;
        self.documents.remove(key);
        self.mru.remove_doc(&mut self.store, key);

        if self.tree.as_ref().is_some_and(|t| t.document_key() == key) {
            self.close();
        } else {
            self.reload()?;
        }
        info!(doc = %key, "Document deleted");
        Ok(DeletedDocument { snapshot, store_position, list_index, had_focus })
    }
}

impl<S: DocumentStore> EditTarget for Session<S> {
    fn has_document(&self, key: &str) -> bool {
        self.store.contains_document(key)
    }

    fn insert_document(&mut self, key: &str) -> EditorResult<()> {
        self.store.create_document(key)?;
        if let Some(prototype) = self.config.default_prototype.as_deref()
            && prototype != key
            && self.store.contains_document(prototype)
        {
            self.store.set(&PartPath::document(key).child(INHERIT_KEY), prototype)?;
        }

        self.documents.insert(0, key);
        self.mru.insert_doc(&mut self.store, key);
        self.reload()?;
        info!(doc = %key, "Document created");
        Ok(())
    }

    fn remove_document(&mut self, key: &str) -> EditorResult<()> {
        self.take_document(key).map(|_| ())
    }

    fn restore_document(&mut self, deleted: &DeletedDocument) -> EditorResult<()> {
        let key = deleted.key();
        self.store.restore_document(deleted.snapshot.clone(), deleted.store_position)?;

        if let Some(index) = deleted.list_index {
            self.documents.insert(index, key);
        }
        if deleted.had_focus {
            self.documents.focus(Some(key));
        }
        self.mru.insert_doc(&mut self.store, key);
        self.reload()?;
        info!(doc = %key, "Document restored");
        Ok(())
    }

    fn move_document(&mut self, from: &str, to: &str) -> EditorResult<()> {
        self.store.rename_document(from, to)?;
        self.documents.rename(from, to);
        self.mru.rename_doc(&mut self.store, from, to);

        match self.tree.as_ref().map(|t| t.document_key() == from) {
            Some(true) => {
                self.tree_mut()?.rename_root(to);
                self.events.push(ViewEvent::RootChanged);
            }
            Some(false) => self.reload()?,
            None => {}
        }
        info!(from = %from, to = %to, "Document renamed");
        Ok(())
    }
}
