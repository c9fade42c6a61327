use crate::types::{NodeId, NodeRef, TreeId};
use glam::Vec3;
use std::collections::VecDeque;

/// A single node of a vessel tree.
///
/// Each node stores its position, the vessel radius at that position, an
/// optional parent reference, and up to two children. The tree as a whole is
/// stored in a contiguous `Vec<TreeNode>`, and [`NodeId`] is used as the
/// index.
///
/// ### Fields
/// - `pos` - World-space position of this node.
/// - `radius` - Vessel radius at this node.
/// - `parent` - Optional parent node ID; `None` only for the root.
/// - `children` - IDs of this node's direct children (at most two).
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub pos: Vec3,
    pub radius: f32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    fn new_root(pos: Vec3, radius: f32) -> Self {
        Self {
            pos,
            radius,
            parent: None,
            children: Vec::with_capacity(2),
        }
    }

    fn new_child(pos: Vec3, radius: f32, parent: NodeId) -> Self {
        Self {
            pos,
            radius,
            parent: Some(parent),
            children: Vec::with_capacity(2),
        }
    }

    /// `true` if this node has no parent.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// `true` if this node has no children (a vessel tip).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// `true` if this node has exactly one child (a segment interior).
    #[inline]
    pub fn is_inter(&self) -> bool {
        self.children.len() == 1
    }

    /// `true` if this node has exactly two children (a bifurcation).
    #[inline]
    pub fn is_joint(&self) -> bool {
        self.children.len() == 2
    }
}

/// A vessel tree stored in a flat arena.
///
/// Nodes are indexed by [`NodeId`]. The node at index `0` is always the
/// root; every other node has exactly one parent and at most two children.
/// Nodes are never removed, so ids are stable for the tree's lifetime.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Creates a new tree with a single root node at `root_pos`.
    ///
    /// ### Parameters
    /// - `root_pos` - Position of the root node.
    /// - `root_radius` - Vessel radius at the root.
    ///
    /// ### Returns
    /// A [`Tree`] containing exactly one node at index `0`.
    pub fn new(root_pos: Vec3, root_radius: f32) -> Self {
        Self {
            nodes: vec![TreeNode::new_root(root_pos, root_radius)],
        }
    }

    /// Adds a new child node under the given parent.
    ///
    /// ### Panics
    /// Panics if `parent` already has two children; the growth engine never
    /// issues such a call.
    pub fn create_node(&mut self, parent: NodeId, pos: Vec3, radius: f32) -> NodeId {
        assert!(
            self.nodes[parent].children.len() < 2,
            "node {parent} already has two children"
        );

        let id = self.nodes.len();
        self.nodes.push(TreeNode::new_child(pos, radius, parent));
        self.nodes[parent].children.push(id);
        id
    }

    #[inline]
    pub fn get_node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    #[inline]
    pub fn get_node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter().enumerate()
    }

    /// Visits `start`, then its parent, and so on up to the root (inclusive).
    pub fn to_root(&self, start: NodeId, mut f: impl FnMut(NodeId, &TreeNode)) {
        let mut curr = Some(start);
        while let Some(id) = curr {
            let node = &self.nodes[id];
            f(id, node);
            curr = node.parent;
        }
    }

    /// Node ids from `start` up to the root, in walk order.
    pub fn path_to_root(&self, start: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        self.to_root(start, |id, _| path.push(id));
        path
    }

    /// Visits every node, parents before children.
    pub fn breadth_first(&self, mut f: impl FnMut(NodeId, &TreeNode)) {
        let mut queue = VecDeque::with_capacity(self.nodes.len());
        queue.push_back(0);
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id];
            f(id, node);
            queue.extend(node.children.iter().copied());
        }
    }
}

/// An ordered collection of vessel trees belonging to one system.
///
/// The forest only ever grows, and only by appending whole trees through
/// [`Forest::create_root`]; trees never merge or split.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new single-node tree and returns the address of its root.
    pub fn create_root(&mut self, pos: Vec3, radius: f32) -> NodeRef {
        let tree = self.trees.len();
        self.trees.push(Tree::new(pos, radius));
        NodeRef::new(tree, 0)
    }

    #[inline]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    #[inline]
    pub fn tree(&self, id: TreeId) -> &Tree {
        &self.trees[id]
    }

    #[inline]
    pub fn tree_mut(&mut self, id: TreeId) -> &mut Tree {
        &mut self.trees[id]
    }

    #[inline]
    pub fn get_node(&self, nref: NodeRef) -> &TreeNode {
        self.trees[nref.tree].get_node(nref.node)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn clear(&mut self) {
        self.trees.clear();
    }

    /// Visits every node of every tree, parents before children.
    pub fn breadth_first(&self, mut f: impl FnMut(TreeId, NodeId, &TreeNode)) {
        for (tid, tree) in self.trees.iter().enumerate() {
            tree.breadth_first(|nid, node| f(tid, nid, node));
        }
    }
}
