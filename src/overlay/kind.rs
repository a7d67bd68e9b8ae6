use serde::{Deserialize, Serialize};

use crate::filter::FilterLevel;
use crate::store::{ANNOTATIONS_KEY, INHERIT_KEY, REFERENCES_KEY};

/// Closed set of node kinds in the overlay tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Part,
    Variable,
    AnnotationGroup,
    Annotation,
    ReferenceGroup,
    Reference,
    Inherit,
}

/// Which edit operations a kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
}

impl NodeKind {
    /// Kind of the child `key` under a node of kind `parent`.
    pub fn classify(parent: NodeKind, key: &str, has_children: bool, has_value: bool) -> Self {
        match parent {
            NodeKind::AnnotationGroup => NodeKind::Annotation,
            NodeKind::ReferenceGroup => NodeKind::Reference,
            _ => match key {
                INHERIT_KEY => NodeKind::Inherit,
                ANNOTATIONS_KEY => NodeKind::AnnotationGroup,
                REFERENCES_KEY => NodeKind::ReferenceGroup,
                _ if has_children || !has_value => NodeKind::Part,
                _ => NodeKind::Variable,
            },
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            NodeKind::Part => Capabilities { add: true, edit: true, delete: true },
            NodeKind::AnnotationGroup | NodeKind::ReferenceGroup => {
                Capabilities { add: true, edit: false, delete: true }
            }
            NodeKind::Variable
            | NodeKind::Annotation
            | NodeKind::Reference
            | NodeKind::Inherit => Capabilities { add: false, edit: true, delete: true },
        }
    }

    /// Visibility predicate for a node of this kind.
    pub fn visible(self, level: FilterLevel, top_layer: bool) -> bool {
        match level {
            FilterLevel::All => true,
            FilterLevel::Overrides => top_layer || self != NodeKind::Variable,
            FilterLevel::Local => top_layer,
        }
    }

    pub fn is_group(self) -> bool {
        matches!(self, NodeKind::AnnotationGroup | NodeKind::ReferenceGroup)
    }

    /// Kinds whose children come from the store.
    pub fn has_children(self) -> bool {
        matches!(self, NodeKind::Part | NodeKind::AnnotationGroup | NodeKind::ReferenceGroup)
    }

    /// Prefix of synthesized entry keys (`a1`, `r1`, ...).
    pub fn entry_prefix(self) -> Option<&'static str> {
        match self {
            NodeKind::AnnotationGroup => Some("a"),
            NodeKind::ReferenceGroup => Some("r"),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Part => "part",
            NodeKind::Variable => "variable",
            NodeKind::AnnotationGroup => "annotation_group",
            NodeKind::Annotation => "annotation",
            NodeKind::ReferenceGroup => "reference_group",
            NodeKind::Reference => "reference",
            NodeKind::Inherit => "inherit",
        }
    }
}
