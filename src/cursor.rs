//! Selection paths that survive tree mutation and refiltering.

use crate::error::EditorResult;
use crate::filter::FilterLevel;
use crate::overlay::{NodeId, OverlayTree};

/// Key path from just below the root to a selected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCursor {
    keys: Vec<String>,
    /// Full child index of each step at capture time.
    positions: Vec<usize>,
    expand_target: bool,
}

impl PathCursor {
    /// Capture the tree's current selection, if any.
    pub fn capture(tree: &OverlayTree) -> Option<Self> {
        tree.selection().and_then(|id| Self::capture_node(tree, id).ok())
    }

    pub fn capture_node(tree: &OverlayTree, id: NodeId) -> EditorResult<Self> {
        let expand_target = tree.get(id)?.expanded;
        let mut keys = Vec::new();
        let mut positions = Vec::new();

        let mut current = id;
        while let Some(parent) = tree.parent(current) {
            keys.push(tree.get(current)?.key.clone());
            positions.push(tree.position(parent, current).unwrap_or_default());
            current = parent;
        }
        keys.reverse();
        positions.reverse();

        Ok(Self { keys, positions, expand_target })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn expand_target(&self) -> bool {
        self.expand_target
    }

    /// Select the nearest equivalent of the captured node. Its ancestors are
    /// expanded only when the resolved node is to be expanded too. Returns
    /// the selected node.
    pub fn restore(&self, tree: &mut OverlayTree, level: FilterLevel) -> EditorResult<NodeId> {
        let (target, expanded) = self.resolve(tree, level);

        if expanded {
            for ancestor in tree.ancestors(target) {
                tree.set_expanded(ancestor, true)?;
            }
        }
        tree.set_expanded(target, expanded)?;
        tree.set_selection(Some(target))?;
        Ok(target)
    }

    /// Node the cursor points at in `tree`, with the expansion it should get.
    pub fn resolve(&self, tree: &OverlayTree, level: FilterLevel) -> (NodeId, bool) {
        let visible = |id: NodeId| tree.node(id).is_some_and(|n| n.visible(level));

        let mut chain = vec![tree.root()];
        let mut missing_at = None;
        for (depth, key) in self.keys.iter().enumerate() {
            let current = chain[chain.len() - 1];
            match tree.child_by_key(current, key) {
                Some(child) => chain.push(child),
                None => {
                    missing_at = Some(depth);
                    break;
                }
            }
        }

        // A resolved step that is filtered out: look around it among its siblings.
        if let Some(step) = chain.iter().skip(1).position(|id| !visible(*id)) {
            let hidden = chain[step + 1];
            let parent = chain[step];
            let position = tree.position(parent, hidden).unwrap_or_default();
            return match nearest_visible(tree, parent, position + 1, position, visible) {
                Some(sibling) => (sibling, self.expand_target),
                None => (parent, true),
            };
        }

        match missing_at {
            None => (chain[chain.len() - 1], self.expand_target),
            Some(depth) => {
                let parent = chain[chain.len() - 1];
                if depth + 1 == self.keys.len() {
                    let anchor = self.positions[depth];
                    if let Some(sibling) = nearest_visible(tree, parent, anchor, anchor, visible) {
                        return (sibling, self.expand_target);
                    }
                }
                (parent, true)
            }
        }
    }
}

/// First visible child of `parent` at or after `forward_from`, else the
/// last visible one before `backward_until`.
fn nearest_visible(
    tree: &OverlayTree,
    parent: NodeId,
    forward_from: usize,
    backward_until: usize,
    visible: impl Fn(NodeId) -> bool,
) -> Option<NodeId> {
    let children = tree.children(parent);
    let backward_until = backward_until.min(children.len());

    children
        .iter()
        .skip(forward_from)
        .copied()
        .find(|c| visible(*c))
        .or_else(|| children[..backward_until].iter().rev().copied().find(|c| visible(*c)))
}
