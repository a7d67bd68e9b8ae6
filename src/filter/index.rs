//! Filtered child index.
//!
//! Every node keeps either `None` (all children visible) or the strictly
//! increasing list of full child indices that are visible at the active
//! level. Structural edits patch those lists in place; only a level change
//! walks the whole tree.

use tracing::debug;

use crate::error::{EditorError, EditorResult};
use crate::overlay::{NodeId, OverlayTree};

use super::level::FilterLevel;

/// Effect of a single node's change on its parent's visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// The node became visible at this filtered index.
    Inserted(usize),
    /// The node was visible at this filtered index and is now hidden.
    Removed(usize),
    /// The node stays visible at this filtered index.
    Changed(usize),
    /// The node was and stays hidden.
    Hidden,
    /// The node is the root and has no parent list.
    Unlisted,
}

/// Mutable view of a tree's filtered lists at one level.
pub struct FilteredIndex<'t> {
    tree: &'t mut OverlayTree,
    level: FilterLevel,
}

impl<'t> FilteredIndex<'t> {
    pub fn new(tree: &'t mut OverlayTree, level: FilterLevel) -> Self {
        Self { tree, level }
    }

    pub fn level(&self) -> FilterLevel {
        self.level
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.tree.node(id).is_some_and(|n| n.visible(self.level))
    }

    /// Recompute every list in the tree.
    pub fn set_level(&mut self) {
        let root = self.tree.root();
        self.refilter(root);
        debug!(level = %self.level, nodes = self.tree.len(), "Tree refiltered");
    }

    /// Recompute the lists of `id` and everything below it.
    pub fn refilter(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let children = self.tree.children(current).to_vec();
            let filtered = if self.level.shows_everything() {
                None
            } else {
                Some(
                    children
                        .iter()
                        .enumerate()
                        .filter(|(_, child)| self.is_visible(**child))
                        .map(|(index, _)| index)
                        .collect(),
                )
            };
            if let Some(node) = self.tree.node_mut(current) {
                node.filtered = filtered;
            }
            stack.extend(children);
        }
    }

    /// Account for the child just placed at `full_index` under `parent`.
    ///
    /// Returns the filtered index it is shown at, or `None` when hidden.
    pub fn insert(&mut self, parent: NodeId, full_index: usize) -> EditorResult<Option<usize>> {
        let child = *self
            .tree
            .children(parent)
            .get(full_index)
            .ok_or(EditorError::IndexOutOfRange { parent, index: full_index })?;
        self.refilter(child);
        let visible = self.is_visible(child);

        let node = self.tree.get_mut(parent)?;
        let Some(list) = node.filtered.as_mut() else {
            return Ok(Some(full_index));
        };

        let position = list.partition_point(|&i| i < full_index);
        for entry in &mut list[position..] {
            *entry += 1;
        }
        if !visible {
            return Ok(None);
        }

        list.insert(position, full_index);
        Ok(Some(position))
    }

    /// Detach `child` from `parent`.
    ///
    /// Returns the filtered index it was shown at, or `None` when it was
    /// already hidden. Fails when `child` is not listed under `parent`.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> EditorResult<Option<usize>> {
        let node = self.tree.get_mut(parent)?;
        let full_index = node
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(EditorError::NotAChild { parent, child })?;
        node.children.remove(full_index);

        let removed = match node.filtered.as_mut() {
            None => Some(full_index),
            Some(list) => {
                let found = list.binary_search(&full_index);
                let position = match found {
                    Ok(position) | Err(position) => position,
                };
                if found.is_ok() {
                    list.remove(position);
                }
                for entry in &mut list[position..] {
                    *entry -= 1;
                }
                found.ok()
            }
        };

        if let Some(node) = self.tree.node_mut(child) {
            node.parent = None;
        }
        Ok(removed)
    }

    /// Re-evaluate one node's visibility after its state changed.
    pub fn changed(&mut self, id: NodeId) -> EditorResult<FilterChange> {
        let Some(parent) = self.tree.get(id)?.parent() else {
            return Ok(FilterChange::Unlisted);
        };
        let visible = self.is_visible(id);

        let node = self.tree.get_mut(parent)?;
        let full_index = node
            .children
            .iter()
            .position(|c| *c == id)
            .ok_or(EditorError::NotAChild { parent, child: id })?;
        let Some(list) = node.filtered.as_mut() else {
            return Ok(FilterChange::Changed(full_index));
        };

        Ok(match (list.binary_search(&full_index), visible) {
            (Ok(position), true) => FilterChange::Changed(position),
            (Ok(position), false) => {
                list.remove(position);
                FilterChange::Removed(position)
            }
            (Err(position), true) => {
                list.insert(position, full_index);
                FilterChange::Inserted(position)
            }
            (Err(_), false) => FilterChange::Hidden,
        })
    }

    /// Whether every list matches the visibility predicate and is strictly increasing.
    pub fn is_consistent(&self) -> bool {
        let mut stack = vec![self.tree.root()];
        while let Some(current) = stack.pop() {
            let Some(node) = self.tree.node(current) else {
                return false;
            };
            let expected: Option<Vec<usize>> = if self.level.shows_everything() {
                None
            } else {
                Some(
                    node.children()
                        .iter()
                        .enumerate()
                        .filter(|(_, child)| self.is_visible(**child))
                        .map(|(index, _)| index)
                        .collect(),
                )
            };
            if node.filtered() != expected.as_deref() {
                return false;
            }
            stack.extend_from_slice(node.children());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore, PartPath};

    fn path(p: &str) -> PartPath {
        PartPath::parse(p).unwrap()
    }

    /// `doc` shows a, b, c, d, e where b and d are local overrides.
    fn tree() -> OverlayTree {
        let mut store = MemoryStore::new();
        store.create_document("base").unwrap();
        for key in ["a", "b", "c", "d", "e"] {
            store.set(&path(&format!("base/{}", key)), "1").unwrap();
        }
        store.create_document("doc").unwrap();
        store.set(&path("doc/@inherit"), "base").unwrap();
        store.set(&path("doc/b"), "2").unwrap();
        store.set(&path("doc/d"), "2").unwrap();
        OverlayTree::load(&store, "doc").unwrap()
    }

    fn child(tree: &OverlayTree, key: &str) -> NodeId {
        tree.child_by_key(tree.root(), key).unwrap()
    }

    #[test]
    fn test_set_level_all_is_identity() {
        let mut tree = tree();
        FilteredIndex::new(&mut tree, FilterLevel::All).set_level();

        assert_eq!(tree.get(tree.root()).unwrap().filtered(), None);
        assert_eq!(tree.filtered_index(child(&tree, "c")), Some(2));
    }

    #[test]
    fn test_set_level_local() {
        let mut tree = tree();
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);
        index.set_level();
        assert!(index.is_consistent());

        // a, b, c, d, e, @inherit
        assert_eq!(tree.get(tree.root()).unwrap().filtered(), Some(&[1, 3, 5][..]));
        assert_eq!(tree.filtered_index(child(&tree, "d")), Some(1));
        assert_eq!(tree.filtered_index(child(&tree, "c")), None);
    }

    #[test]
    fn test_remove_hidden_child_shifts_entries() {
        let mut tree = tree();
        let root = tree.root();
        let c = child(&tree, "c");
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);
        index.set_level();

        assert_eq!(index.remove(root, c).unwrap(), None);
        assert!(index.is_consistent());
        assert_eq!(tree.get(root).unwrap().filtered(), Some(&[1, 2, 4][..]));
    }

    #[test]
    fn test_remove_visible_child() {
        let mut tree = tree();
        let root = tree.root();
        let b = child(&tree, "b");
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);
        index.set_level();

        assert_eq!(index.remove(root, b).unwrap(), Some(0));
        assert_eq!(tree.get(root).unwrap().filtered(), Some(&[2, 4][..]));
    }

    #[test]
    fn test_remove_foreign_child_fails() {
        let mut tree = tree();
        let b = child(&tree, "b");
        let c = child(&tree, "c");
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);

        let result = index.remove(b, c);
        assert!(matches!(result, Err(EditorError::NotAChild { .. })));
    }

    #[test]
    fn test_changed_flips_visibility() {
        let mut tree = tree();
        let root = tree.root();
        let c = child(&tree, "c");
        let b = child(&tree, "b");
        FilteredIndex::new(&mut tree, FilterLevel::Local).set_level();

        tree.get_mut(c).unwrap().top_layer = true;
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);
        assert_eq!(index.changed(c).unwrap(), FilterChange::Inserted(1));
        assert_eq!(index.changed(c).unwrap(), FilterChange::Changed(1));

        tree.get_mut(b).unwrap().top_layer = false;
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);
        assert_eq!(index.changed(b).unwrap(), FilterChange::Removed(0));
        assert_eq!(index.changed(b).unwrap(), FilterChange::Hidden);
        assert!(index.is_consistent());
        assert_eq!(tree.get(root).unwrap().filtered(), Some(&[2, 3, 5][..]));
    }

    #[test]
    fn test_changed_root_is_unlisted() {
        let mut tree = tree();
        let root = tree.root();
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);
        assert_eq!(index.changed(root).unwrap(), FilterChange::Unlisted);
    }

    #[test]
    fn test_insert_out_of_range() {
        let mut tree = tree();
        let root = tree.root();
        let mut index = FilteredIndex::new(&mut tree, FilterLevel::Local);

        let result = index.insert(root, 42);
        assert!(matches!(result, Err(EditorError::IndexOutOfRange { index: 42, .. })));
    }
}
