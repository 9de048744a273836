//! Utilities to traverse the KdTree structure.

use crate::kdtree::index::KdNode;
use crate::kdtree::IndexedPoint;
use crate::r#type::IndexableNum;

/// A node of a KdTree, borrowed for manual traversal.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a, N: IndexableNum> {
    /// The arena of the tree this node belongs to
    nodes: &'a [KdNode<N>],

    /// Position of this node in `nodes`
    id: usize,
}

impl<'a, N: IndexableNum> Node<'a, N> {
    pub(crate) fn from_root(nodes: &'a [KdNode<N>]) -> Option<Self> {
        (!nodes.is_empty()).then_some(Self { nodes, id: 0 })
    }

    #[inline]
    fn data(&self) -> &'a KdNode<N> {
        &self.nodes[self.id]
    }

    /// Position of this node in the tree's preorder arena.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The axis that the children of this node are split over.
    #[inline]
    pub fn axis(&self) -> usize {
        self.data().axis
    }

    /// The point stored at this node.
    #[inline]
    pub fn location(&self) -> &'a IndexedPoint<N> {
        &self.data().location
    }

    /// The child holding points not greater than this one on [`axis`][Node::axis].
    pub fn left_child(&self) -> Option<Node<'a, N>> {
        self.data().left.map(|id| Self {
            nodes: self.nodes,
            id,
        })
    }

    /// The child holding points not smaller than this one on [`axis`][Node::axis].
    pub fn right_child(&self) -> Option<Node<'a, N>> {
        self.data().right.map(|id| Self {
            nodes: self.nodes,
            id,
        })
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.data().left.is_none() && self.data().right.is_none()
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// Visit this node and all its descendants, parents before children and left before right.
    pub fn descendants(&self) -> impl Iterator<Item = Node<'a, N>> {
        let mut stack = vec![*self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            if let Some(right) = node.right_child() {
                stack.push(right);
            }
            if let Some(left) = node.left_child() {
                stack.push(left);
            }
            Some(node)
        })
    }
}
