/// Index of a node inside its owning [`Tree`](crate::tree::Tree).
pub type NodeId = usize;

/// Index of a tree inside a [`Forest`](crate::tree::Forest).
pub type TreeId = usize;

/// Stable address of a node across a whole forest.
///
/// Trees never merge, split, or drop nodes, so a `NodeRef` stays valid for
/// the lifetime of the forest it was issued for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub tree: TreeId,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(tree: TreeId, node: NodeId) -> Self {
        Self { tree, node }
    }
}
