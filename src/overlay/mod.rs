//! Overlay tree of the open document and the per-kind edit operations.

mod edit;
mod kind;
mod node;
mod tree;

pub use edit::{AddRequest, EditContext, parse_assignment};
pub use kind::{Capabilities, NodeKind};
pub use node::{NodeId, OverlayNode};
pub use tree::OverlayTree;
