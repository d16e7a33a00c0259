//! Node storage for the metadata tree.
//!
//! Nodes live in an arena owned by [`crate::Metadata`] and reference each
//! other by index, so parent back-pointers are plain non-owning ids and
//! the tree cannot form ownership cycles.

use radar_common::Value;

/// Index of a node within its owning metadata tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// What a node is: a group, a typed attribute, or a dataset placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Structural node with no payload.
    Group,
    /// Leaf carrying a scalar value.
    Attribute(Value),
    /// Placeholder for a data array; the array itself is not modeled.
    Dataset,
}

impl NodeKind {
    pub fn is_attribute(&self) -> bool {
        matches!(self, NodeKind::Attribute(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, NodeKind::Group)
    }

    /// The attribute value, if this is an attribute node.
    pub fn value(&self) -> Option<&Value> {
        match self {
            NodeKind::Attribute(v) => Some(v),
            _ => None,
        }
    }
}

/// Arena entry for a single node.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl NodeData {
    pub(crate) fn new(name: impl Into<String>, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            kind,
        }
    }
}
