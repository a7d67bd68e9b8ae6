//! Edit operations on the overlay tree.
//!
//! Each operation writes to the store first, then brings the affected nodes
//! back in line with it and projects every structural change through the
//! filtered index into view events.

use tracing::{debug, warn};

use crate::error::{EditorError, EditorResult};
use crate::events::ViewEvent;
use crate::filter::{FilterChange, FilterLevel, FilteredIndex};
use crate::store::{ANNOTATIONS_KEY, ClearOutcome, DocumentStore, INHERIT_KEY, REFERENCES_KEY};

use super::kind::NodeKind;
use super::node::{NodeId, Resolved};
use super::tree::OverlayTree;

/// What to add below a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddRequest {
    /// Empty child part of a part.
    Part(String),
    /// `name[=value]` variable of a part.
    Variable(String),
    AnnotationGroup,
    ReferenceGroup,
    /// Prototype document for a part.
    Inherit(String),
    /// `name[=value]` entry of an annotation or reference group; empty text
    /// picks the next free default key.
    Entry(String),
}

/// Split `name[=value]`. Text without `=` is a bare name with an empty value.
pub fn parse_assignment(text: &str) -> (String, String) {
    match text.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

pub struct EditContext<'a, S: DocumentStore + ?Sized> {
    store: &'a mut S,
    tree: &'a mut OverlayTree,
    level: FilterLevel,
    events: &'a mut Vec<ViewEvent>,
}

impl<'a, S: DocumentStore + ?Sized> EditContext<'a, S> {
    pub fn new(
        store: &'a mut S,
        tree: &'a mut OverlayTree,
        level: FilterLevel,
        events: &'a mut Vec<ViewEvent>,
    ) -> Self {
        Self { store, tree, level, events }
    }

    fn index(&mut self) -> FilteredIndex<'_> {
        FilteredIndex::new(&mut *self.tree, self.level)
    }

    /// Add below `target`. `selection` positions new group entries.
    ///
    /// Returns the node now representing the request, or `None` when the
    /// request does not apply to the target's kind.
    pub fn add(
        &mut self,
        target: NodeId,
        request: AddRequest,
        selection: Option<NodeId>,
    ) -> EditorResult<Option<NodeId>> {
        let kind = self.tree.get(target)?.kind;
        if !kind.capabilities().add {
            warn!(node = %target, kind = kind.as_str(), "Node does not accept children");
            return Ok(None);
        }

        match (kind, request) {
            (NodeKind::Part, AddRequest::Part(text)) => {
                let (name, _) = parse_assignment(&text);
                self.add_part_child(target, &name, None)
            }
            (NodeKind::Part, AddRequest::Variable(text)) => {
                let (name, value) = parse_assignment(&text);
                self.add_part_child(target, &name, Some(&value))
            }
            (NodeKind::Part, AddRequest::AnnotationGroup) => self.add_group(target, ANNOTATIONS_KEY),
            (NodeKind::Part, AddRequest::ReferenceGroup) => self.add_group(target, REFERENCES_KEY),
            (NodeKind::Part, AddRequest::Inherit(prototype)) => {
                self.set_prototype(target, prototype.trim())
            }
            (NodeKind::AnnotationGroup | NodeKind::ReferenceGroup, AddRequest::Entry(text)) => {
                self.add_entry(target, &text, selection).map(Some)
            }
            (kind, request) => {
                warn!(node = %target, kind = kind.as_str(), request = ?request, "Unsupported add request");
                Ok(None)
            }
        }
    }

    /// Apply edited text to a node. Returns the node that now shows the edit,
    /// which differs from `id` when a rename had to create a sibling.
    pub fn apply_edit(&mut self, id: NodeId, text: &str) -> EditorResult<NodeId> {
        let node = self.tree.get(id)?;
        let (kind, parent) = (node.kind, node.parent());

        match kind {
            NodeKind::Annotation | NodeKind::Reference => self.edit_entry(id, text),
            NodeKind::Inherit => {
                let part = parent.ok_or(EditorError::RootNode("edit"))?;
                let prototype = text.trim();
                if prototype.is_empty() {
                    self.delete(id)?;
                    return Ok(part);
                }
                self.set_prototype(part, prototype).map(|inherit| inherit.unwrap_or(part))
            }
            NodeKind::Variable | NodeKind::Part => {
                let path = self.tree.path(id)?;
                self.store.set(&path, text.trim())?;
                self.refresh_and_notify(id)?;
                self.refresh_ancestors(id)?;
                Ok(id)
            }
            NodeKind::AnnotationGroup | NodeKind::ReferenceGroup => {
                warn!(node = %id, kind = kind.as_str(), "Groups carry no editable text");
                Ok(id)
            }
        }
    }

    /// Clear the node's top-layer definition, removing the node when nothing
    /// inherited remains underneath.
    pub fn delete(&mut self, id: NodeId) -> EditorResult<()> {
        let node = self.tree.get(id)?;
        let kind = node.kind;
        let parent = node.parent().ok_or(EditorError::RootNode("delete"))?;

        match kind {
            NodeKind::AnnotationGroup | NodeKind::ReferenceGroup => self.delete_group(id),
            NodeKind::Inherit => {
                let path = self.tree.path(id)?;
                self.store.clear(&path)?;
                self.rebuild_children(parent)?;
                self.refresh_chain(parent)
            }
            NodeKind::Part | NodeKind::Variable | NodeKind::Annotation | NodeKind::Reference => {
                let path = self.tree.path(id)?;
                match self.store.clear(&path)? {
                    ClearOutcome::Revealed => {
                        self.refresh_and_notify(id)?;
                        if kind.has_children() {
                            self.sync_children(id)?;
                        }
                        self.refresh_ancestors(id)
                    }
                    ClearOutcome::Removed => {
                        self.remove_node(id)?;
                        let parent_kind = self.tree.get(parent)?.kind;
                        // A group still resolving below the top layer keeps the
                        // tombstones just written; clearing it would revive them.
                        if parent_kind.is_group()
                            && self.tree.children(parent).is_empty()
                            && !self.store.has_inherited(&self.tree.path(parent)?)
                        {
                            debug!(group = %parent, "Last entry removed, dropping group");
                            self.delete_group(parent)
                        } else {
                            self.refresh_chain(parent)
                        }
                    }
                }
            }
        }
    }

    fn add_part_child(
        &mut self,
        part: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> EditorResult<Option<NodeId>> {
        if name.is_empty() {
            warn!(node = %part, "Ignoring child with empty name");
            return Ok(None);
        }

        let path = self.tree.path(part)?.child(name);
        if let Some(existing) = self.tree.child_by_key(part, name) {
            if let Some(value) = value {
                self.store.set(&path, value)?;
                self.refresh_and_notify(existing)?;
                self.refresh_ancestors(existing)?;
            }
            return Ok(Some(existing));
        }

        match value {
            Some(value) => self.store.set(&path, value)?,
            None => self.store.create(&path)?,
        }
        let end = self.tree.children(part).len();
        let id = self.insert_from_store(part, name, end)?;
        self.refresh_ancestors(id)?;
        Ok(Some(id))
    }

    fn add_group(&mut self, part: NodeId, key: &str) -> EditorResult<Option<NodeId>> {
        if let Some(existing) = self.tree.child_by_key(part, key) {
            return Ok(Some(existing));
        }

        let path = self.tree.path(part)?.child(key);
        self.store.create(&path)?;
        let end = self.tree.children(part).len();
        let id = self.insert_from_store(part, key, end)?;
        self.refresh_ancestors(id)?;
        Ok(Some(id))
    }

    fn set_prototype(&mut self, part: NodeId, prototype: &str) -> EditorResult<Option<NodeId>> {
        if prototype.is_empty() {
            warn!(node = %part, "Ignoring empty prototype");
            return Ok(None);
        }

        let path = self.tree.path(part)?.child(INHERIT_KEY);
        self.store.set(&path, prototype)?;
        debug!(path = %path, prototype = %prototype, "Prototype changed, rebuilding");
        self.rebuild_children(part)?;
        self.refresh_chain(part)?;
        Ok(self.tree.child_by_key(part, INHERIT_KEY))
    }

    fn add_entry(
        &mut self,
        group: NodeId,
        text: &str,
        selection: Option<NodeId>,
    ) -> EditorResult<NodeId> {
        let (mut name, value) = parse_assignment(text);
        if name.is_empty() {
            name = self.next_entry_key(group)?;
        }

        let path = self.tree.path(group)?.child(&name);
        if let Some(existing) = self.tree.child_by_key(group, &name) {
            if !self.tree.get(existing)?.top_layer {
                self.store.set(&path, &value)?;
                self.refresh_and_notify(existing)?;
                self.refresh_ancestors(existing)?;
            }
            return Ok(existing);
        }

        self.store.set(&path, &value)?;
        let position = selection
            .and_then(|s| self.tree.position(group, s))
            .map_or(self.tree.children(group).len(), |p| p + 1);
        let id = self.insert_from_store(group, &name, position)?;
        self.refresh_ancestors(id)?;
        Ok(id)
    }

    /// First unused `a<n>` / `r<n>` key of a group.
    fn next_entry_key(&self, group: NodeId) -> EditorResult<String> {
        let kind = self.tree.get(group)?.kind;
        let prefix = kind.entry_prefix().unwrap_or("e");
        let path = self.tree.path(group)?;

        let mut n = 1;
        loop {
            let key = format!("{}{}", prefix, n);
            if self.tree.child_by_key(group, &key).is_none() && !self.store.exists(&path.child(&key))
            {
                return Ok(key);
            }
            n += 1;
        }
    }

    fn edit_entry(&mut self, id: NodeId, text: &str) -> EditorResult<NodeId> {
        let (name, value) = parse_assignment(text);
        let node = self.tree.get(id)?;
        let key = node.key.clone();
        let parent = node.parent().ok_or(EditorError::RootNode("edit"))?;

        let collides = match self.tree.child_by_key(parent, &name) {
            Some(sibling) if sibling != id => self.tree.get(sibling)?.top_layer,
            _ => false,
        };
        let old_path = self.tree.path(id)?;

        if name.is_empty() || name == key || collides {
            self.store.set(&old_path, &value)?;
            self.refresh_and_notify(id)?;
            self.refresh_ancestors(id)?;
            return Ok(id);
        }

        // Only the top-layer definition goes; an inherited old key stays shown.
        if self.store.is_top_layer(&old_path) {
            self.store.clear(&old_path)?;
        }
        self.store.set(&old_path.sibling(&name), &value)?;
        let old_remains = self.store.exists(&old_path);
        debug!(from = %key, to = %name, old_remains, "Entry renamed");

        let result = match (old_remains, self.tree.child_by_key(parent, &name)) {
            (false, None) => {
                self.tree.get_mut(id)?.key = name;
                self.refresh_and_notify(id)?;
                id
            }
            (false, Some(sibling)) => {
                self.remove_node(id)?;
                self.refresh_and_notify(sibling)?;
                sibling
            }
            (true, None) => {
                self.refresh_and_notify(id)?;
                let position = self.tree.position(parent, id).map_or(0, |p| p + 1);
                self.insert_from_store(parent, &name, position)?
            }
            (true, Some(sibling)) => {
                self.refresh_and_notify(id)?;
                self.refresh_and_notify(sibling)?;
                sibling
            }
        };

        self.refresh_chain(parent)?;
        Ok(result)
    }

    fn delete_group(&mut self, group: NodeId) -> EditorResult<()> {
        let path = self.tree.path(group)?;
        let parent = self.tree.parent(group).ok_or(EditorError::RootNode("delete"))?;

        match self.store.clear(&path)? {
            ClearOutcome::Revealed => {
                self.refresh_and_notify(group)?;
                self.sync_children(group)?;
                self.refresh_ancestors(group)
            }
            ClearOutcome::Removed => {
                self.remove_node(group)?;
                self.refresh_chain(parent)
            }
        }
    }

    /// Build `parent/key` from the store and show it at full index `position`.
    fn insert_from_store(
        &mut self,
        parent: NodeId,
        key: &str,
        position: usize,
    ) -> EditorResult<NodeId> {
        let id = self.tree.build_subtree(&*self.store, parent, key)?;
        let position = self.tree.attach(parent, position, id)?;

        if let Some(index) = self.index().insert(parent, position)? {
            self.events.push(ViewEvent::Inserted { parent, index, node: id });
        }
        Ok(id)
    }

    fn remove_node(&mut self, id: NodeId) -> EditorResult<()> {
        let parent = self.tree.parent(id).ok_or(EditorError::RootNode("remove"))?;

        if let Some(index) = self.index().remove(parent, id)? {
            self.events.push(ViewEvent::Removed { parent, index, node: id });
        }
        self.tree.free_subtree(id);
        Ok(())
    }

    fn notify_changed(&mut self, id: NodeId) -> EditorResult<()> {
        let Some(parent) = self.tree.parent(id) else {
            self.events.push(ViewEvent::RootChanged);
            return Ok(());
        };

        match self.index().changed(id)? {
            FilterChange::Inserted(index) => {
                self.events.push(ViewEvent::Inserted { parent, index, node: id })
            }
            FilterChange::Removed(index) => {
                self.events.push(ViewEvent::Removed { parent, index, node: id })
            }
            FilterChange::Changed(index) => self.events.push(ViewEvent::Changed { parent, index }),
            FilterChange::Hidden | FilterChange::Unlisted => {}
        }
        Ok(())
    }

    fn refresh(&mut self, id: NodeId) -> EditorResult<bool> {
        let path = self.tree.path(id)?;
        let resolved = Resolved::read(&*self.store, &path);
        Ok(self.tree.get_mut(id)?.apply(resolved))
    }

    /// Re-read a node whose own value was just written and always report it.
    fn refresh_and_notify(&mut self, id: NodeId) -> EditorResult<()> {
        self.refresh(id)?;
        self.notify_changed(id)
    }

    /// Re-read `from` and its ancestors, notifying those whose state moved.
    fn refresh_chain(&mut self, from: NodeId) -> EditorResult<()> {
        let mut current = Some(from);
        while let Some(id) = current {
            if self.refresh(id)? {
                self.notify_changed(id)?;
            }
            current = self.tree.parent(id);
        }
        Ok(())
    }

    fn refresh_ancestors(&mut self, id: NodeId) -> EditorResult<()> {
        match self.tree.parent(id) {
            Some(parent) => self.refresh_chain(parent),
            None => Ok(()),
        }
    }

    /// Bring the children of `id` in line with the store, keeping nodes whose
    /// keys survive.
    fn sync_children(&mut self, id: NodeId) -> EditorResult<()> {
        let path = self.tree.path(id)?;
        let wanted = self.store.children(&path);

        for child in self.tree.children(id).to_vec().into_iter().rev() {
            let key = &self.tree.get(child)?.key;
            if !wanted.contains(key) {
                self.remove_node(child)?;
            }
        }

        for (position, key) in wanted.iter().enumerate() {
            match self.tree.child_by_key(id, key) {
                Some(child) => {
                    if self.refresh(child)? {
                        self.notify_changed(child)?;
                    }
                    if self.tree.get(child)?.kind.has_children() {
                        self.sync_children(child)?;
                    }
                }
                None => {
                    self.insert_from_store(id, key, position)?;
                }
            }
        }
        Ok(())
    }

    /// Drop and rebuild every child of a part after its prototype changed.
    fn rebuild_children(&mut self, part: NodeId) -> EditorResult<()> {
        for child in self.tree.children(part).to_vec().into_iter().rev() {
            self.remove_node(child)?;
        }

        let path = self.tree.path(part)?;
        for (position, key) in self.store.children(&path).iter().enumerate() {
            self.insert_from_store(part, key, position)?;
        }
        Ok(())
    }
}
