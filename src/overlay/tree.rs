//! Arena-backed overlay tree of the open document.
//!
//! Children own nothing but indices; the parent link is a plain index too,
//! so the tree has no reference cycles. Freed slots are never reused while
//! the tree lives, which keeps a stale `NodeId` from aliasing a new node.

use tracing::debug;

use crate::error::{EditorError, EditorResult};
use crate::store::{DocumentStore, PartPath, StoreError};

use super::kind::NodeKind;
use super::node::{NodeId, OverlayNode, Resolved};

#[derive(Debug, Clone)]
pub struct OverlayTree {
    nodes: Vec<Option<OverlayNode>>,
    root: NodeId,
    selection: Option<NodeId>,
}

impl OverlayTree {
    /// Build the merged tree of `doc`. Filtered lists start unset; apply a
    /// level with [`FilteredIndex::set_level`](crate::filter::FilteredIndex::set_level).
    pub fn load<S: DocumentStore + ?Sized>(store: &S, doc: &str) -> EditorResult<Self> {
        if !store.contains_document(doc) {
            return Err(StoreError::DocumentNotFound(doc.to_string()).into());
        }

        let mut tree = Self { nodes: Vec::new(), root: NodeId(0), selection: None };
        let path = PartPath::document(doc);
        let mut root = OverlayNode::new(doc, NodeKind::Part, None);
        root.apply(Resolved::read(store, &path));
        root.expanded = true;
        tree.root = tree.alloc(root);

        for key in store.children(&path) {
            let child = tree.build_subtree(store, tree.root, &key)?;
            tree.get_mut(tree.root)?.children.push(child);
        }

        debug!(doc = %doc, nodes = tree.len(), "Overlay tree loaded");
        Ok(tree)
    }

    /// Build the node for `parent/key` and everything below it. The new node
    /// points at `parent` but is not yet listed among its children.
    pub(crate) fn build_subtree<S: DocumentStore + ?Sized>(
        &mut self,
        store: &S,
        parent: NodeId,
        key: &str,
    ) -> EditorResult<NodeId> {
        let parent_kind = self.get(parent)?.kind;
        let path = self.path(parent)?.child(key);
        let child_keys = store.children(&path);
        let has_value = store.get(&path).is_some();

        let kind = NodeKind::classify(parent_kind, key, !child_keys.is_empty(), has_value);
        let mut node = OverlayNode::new(key, kind, Some(parent));
        node.apply(Resolved::read(store, &path));
        let id = self.alloc(node);

        if kind.has_children() {
            for child_key in child_keys {
                let child = self.build_subtree(store, id, &child_key)?;
                self.get_mut(id)?.children.push(child);
            }
        }

        Ok(id)
    }

    fn alloc(&mut self, node: OverlayNode) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    /// List `child` among the children of `parent` at `position`.
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        position: usize,
        child: NodeId,
    ) -> EditorResult<usize> {
        let node = self.get_mut(parent)?;
        let position = position.min(node.children.len());
        node.children.insert(position, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(position)
    }

    /// Drop a detached node and all of its descendants.
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children);
            }
            if self.selection == Some(current) {
                self.selection = None;
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document_key(&self) -> &str {
        self.node(self.root).map(|n| n.key.as_str()).unwrap_or_default()
    }

    pub(crate) fn rename_root(&mut self, key: &str) {
        if let Some(root) = self.nodes.get_mut(self.root.0).and_then(Option::as_mut) {
            root.key = key.to_string();
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&OverlayNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut OverlayNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn get(&self, id: NodeId) -> EditorResult<&OverlayNode> {
        self.node(id).ok_or(EditorError::NodeNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> EditorResult<&mut OverlayNode> {
        self.node_mut(id).ok_or(EditorError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.node(*c).is_some_and(|n| n.key == key))
    }

    /// Full index of `child` among the children of `parent`.
    pub fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors
    }

    /// Store path of a node: the document key followed by the child keys.
    pub fn path(&self, id: NodeId) -> EditorResult<PartPath> {
        let mut keys = vec![self.get(id)?.key.clone()];
        for ancestor in self.ancestors(id) {
            keys.push(self.get(ancestor)?.key.clone());
        }
        keys.reverse();
        Ok(PartPath::from_keys(keys)?)
    }

    /// Keys from just below the root down to `id`.
    pub fn key_path(&self, id: NodeId) -> EditorResult<Vec<String>> {
        Ok(self.path(id)?.relative().to_vec())
    }

    /// Live nodes matching `predicate`, in arena order.
    pub fn find_all(&self, predicate: impl Fn(&OverlayNode) -> bool) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().filter(|n| predicate(n)).map(|_| NodeId(i)))
            .collect()
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn set_selection(&mut self, id: Option<NodeId>) -> EditorResult<()> {
        if let Some(id) = id {
            self.get(id)?;
        }
        self.selection = id;
        Ok(())
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> EditorResult<()> {
        self.get_mut(id)?.expanded = expanded;
        Ok(())
    }

    /// Position of `id` in its parent's visible list; `None` when hidden or root.
    pub fn filtered_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        let full = self.position(parent, id)?;
        match self.node(parent)?.filtered() {
            None => Some(full),
            Some(list) => list.binary_search(&full).ok(),
        }
    }

    /// Translate a visible position back into a full child index.
    pub fn full_index(&self, parent: NodeId, filtered_index: usize) -> Option<usize> {
        let node = self.node(parent)?;
        match node.filtered() {
            None => (filtered_index < node.children.len()).then_some(filtered_index),
            Some(list) => list.get(filtered_index).copied(),
        }
    }

    /// Children currently shown, in display order.
    pub fn visible_children(&self, parent: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(parent) else {
            return Vec::new();
        };
        match node.filtered() {
            None => node.children.clone(),
            Some(list) => list.iter().filter_map(|i| node.children.get(*i).copied()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_document("furniture").unwrap();
        store.set(&PartPath::parse("furniture/legs").unwrap(), "4").unwrap();
        store.set(&PartPath::parse("furniture/@annotations/a1").unwrap(), "sturdy").unwrap();
        store.create_document("chair").unwrap();
        store.set(&PartPath::parse("chair/@inherit").unwrap(), "furniture").unwrap();
        store.set(&PartPath::parse("chair/seat/height").unwrap(), "45").unwrap();
        store
    }

    #[test]
    fn test_load_builds_merged_tree() {
        let tree = OverlayTree::load(&store(), "chair").unwrap();
        let root = tree.root();

        let keys: Vec<&str> =
            tree.children(root).iter().map(|c| tree.get(*c).unwrap().key.as_str()).collect();
        assert_eq!(keys, vec!["legs", "@annotations", "@inherit", "seat"]);
        assert_eq!(tree.document_key(), "chair");
    }

    #[test]
    fn test_load_classifies_kinds() {
        let tree = OverlayTree::load(&store(), "chair").unwrap();
        let root = tree.root();

        let kind = |key: &str| tree.get(tree.child_by_key(root, key).unwrap()).unwrap().kind;
        assert_eq!(kind("legs"), NodeKind::Variable);
        assert_eq!(kind("@annotations"), NodeKind::AnnotationGroup);
        assert_eq!(kind("@inherit"), NodeKind::Inherit);
        assert_eq!(kind("seat"), NodeKind::Part);

        let group = tree.child_by_key(root, "@annotations").unwrap();
        let entry = tree.child_by_key(group, "a1").unwrap();
        assert_eq!(tree.get(entry).unwrap().kind, NodeKind::Annotation);
    }

    #[test]
    fn test_load_resolves_override_state() {
        let tree = OverlayTree::load(&store(), "chair").unwrap();
        let root = tree.root();

        let legs = tree.get(tree.child_by_key(root, "legs").unwrap()).unwrap();
        assert!(!legs.top_layer);
        assert_eq!(legs.value.as_deref(), Some("4"));

        let seat = tree.get(tree.child_by_key(root, "seat").unwrap()).unwrap();
        assert!(seat.top_layer);
    }

    #[test]
    fn test_load_missing_document() {
        let result = OverlayTree::load(&store(), "table");
        assert!(matches!(result, Err(EditorError::Store(StoreError::DocumentNotFound(_)))));
    }

    #[test]
    fn test_path_and_key_path() {
        let tree = OverlayTree::load(&store(), "chair").unwrap();
        let seat = tree.child_by_key(tree.root(), "seat").unwrap();
        let height = tree.child_by_key(seat, "height").unwrap();

        assert_eq!(tree.path(height).unwrap().to_string(), "chair/seat/height");
        assert_eq!(tree.key_path(height).unwrap(), vec!["seat", "height"]);
        assert_eq!(tree.ancestors(height), vec![seat, tree.root()]);
    }

    #[test]
    fn test_free_subtree_clears_selection() {
        let mut tree = OverlayTree::load(&store(), "chair").unwrap();
        let root = tree.root();
        let seat = tree.child_by_key(root, "seat").unwrap();
        let height = tree.child_by_key(seat, "height").unwrap();
        tree.set_selection(Some(height)).unwrap();

        let before = tree.len();
        tree.get_mut(root).unwrap().children.retain(|c| *c != seat);
        tree.free_subtree(seat);

        assert_eq!(tree.len(), before - 2);
        assert!(!tree.contains(height));
        assert_eq!(tree.selection(), None);
    }

    #[test]
    fn test_visible_children_without_filter() {
        let tree = OverlayTree::load(&store(), "chair").unwrap();
        let root = tree.root();

        assert_eq!(tree.visible_children(root), tree.children(root).to_vec());
        assert_eq!(tree.full_index(root, 3), Some(3));
        assert_eq!(tree.full_index(root, 4), None);
    }
}
