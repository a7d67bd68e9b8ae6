use thiserror::Error;

use crate::overlay::NodeId;
use crate::store::StoreError;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Child index {index} out of range for {parent}")]
    IndexOutOfRange { parent: NodeId, index: usize },

    #[error("Cannot {0} the document root")]
    RootNode(&'static str),

    #[error("No document is open")]
    NoOpenDocument,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
