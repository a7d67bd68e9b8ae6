//! Structural change notifications for views.

use crate::overlay::NodeId;

/// One view-level change, addressed in filtered (display) index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    Inserted { parent: NodeId, index: usize, node: NodeId },
    Removed { parent: NodeId, index: usize, node: NodeId },
    Changed { parent: NodeId, index: usize },
    /// The root node itself changed (value or document key).
    RootChanged,
    /// The whole tree was rebuilt or refiltered; views reload from scratch.
    Reloaded,
}

/// Receiver of view events, usually a tree widget.
pub trait ViewListener {
    fn inserted(&mut self, parent: NodeId, index: usize, node: NodeId);
    fn removed(&mut self, parent: NodeId, index: usize, node: NodeId);
    fn changed(&mut self, parent: NodeId, index: usize);
    fn root_changed(&mut self) {}
    fn reloaded(&mut self) {}
}

impl ViewEvent {
    pub fn deliver(self, listener: &mut dyn ViewListener) {
        match self {
            ViewEvent::Inserted { parent, index, node } => listener.inserted(parent, index, node),
            ViewEvent::Removed { parent, index, node } => listener.removed(parent, index, node),
            ViewEvent::Changed { parent, index } => listener.changed(parent, index),
            ViewEvent::RootChanged => listener.root_changed(),
            ViewEvent::Reloaded => listener.reloaded(),
        }
    }
}
