use std::fmt;

use crate::filter::FilterLevel;
use crate::store::{DocumentStore, PartPath};

use super::kind::NodeKind;

/// Stable index of a node in an [`OverlayTree`](super::OverlayTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One store part as seen through the open document.
#[derive(Debug, Clone)]
pub struct OverlayNode {
    pub key: String,
    /// Value set in the open document itself.
    pub raw_value: Option<String>,
    /// Value after prototype resolution.
    pub value: Option<String>,
    /// Value the prototype chain supplies underneath any override.
    pub inherited: Option<String>,
    pub kind: NodeKind,
    pub top_layer: bool,
    pub expanded: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) filtered: Option<Vec<usize>>,
}

/// Override state of a path as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    raw_value: Option<String>,
    value: Option<String>,
    inherited: Option<String>,
    top_layer: bool,
}

impl Resolved {
    pub(crate) fn read<S: DocumentStore + ?Sized>(store: &S, path: &PartPath) -> Self {
        Self {
            raw_value: store.local_value(path),
            value: store.get(path),
            inherited: store.inherited_value(path),
            top_layer: store.is_top_layer(path),
        }
    }
}

impl OverlayNode {
    pub(crate) fn new(key: impl Into<String>, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            key: key.into(),
            raw_value: None,
            value: None,
            inherited: None,
            kind,
            top_layer: false,
            expanded: false,
            parent,
            children: Vec::new(),
            filtered: None,
        }
    }

    /// Take over the resolved state, reporting whether anything shown changed.
    pub(crate) fn apply(&mut self, resolved: Resolved) -> bool {
        let changed = self.raw_value != resolved.raw_value
            || self.value != resolved.value
            || self.inherited != resolved.inherited
            || self.top_layer != resolved.top_layer;

        self.raw_value = resolved.raw_value;
        self.value = resolved.value;
        self.inherited = resolved.inherited;
        self.top_layer = resolved.top_layer;
        changed
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Visible child positions, or `None` when every child is visible.
    pub fn filtered(&self) -> Option<&[usize]> {
        self.filtered.as_deref()
    }

    pub fn visible(&self, level: FilterLevel) -> bool {
        self.kind.visible(level, self.top_layer)
    }

    /// Nothing in the open document touches this node.
    pub fn is_pure(&self) -> bool {
        !self.top_layer
    }

    /// Defined locally on top of an inherited value.
    pub fn is_override(&self) -> bool {
        self.top_layer && self.inherited.is_some()
    }

    pub fn label(&self) -> String {
        let value = self.value.as_deref().unwrap_or("");
        match self.kind {
            NodeKind::AnnotationGroup => "annotations".to_string(),
            NodeKind::ReferenceGroup => "references".to_string(),
            NodeKind::Inherit => format!("inherits {}", value),
            NodeKind::Part if self.value.is_none() => self.key.clone(),
            NodeKind::Part => format!("{}: {}", self.key, value),
            NodeKind::Variable | NodeKind::Annotation | NodeKind::Reference => {
                format!("{} = {}", self.key, value)
            }
        }
    }
}
