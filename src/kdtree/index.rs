use std::str::FromStr;

use crate::error::KdTreeError;
use crate::kdtree::codec;
use crate::kdtree::{IndexedPoint, KdTreeBuilder, RoundRobin};
use crate::r#type::IndexableNum;

/// A single vertex of a [`KdTree`], stored in the tree's preorder arena.
///
/// Children are arena positions. A child always sits after its parent, so the arena never
/// contains a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct KdNode<N: IndexableNum> {
    pub(crate) axis: usize,
    pub(crate) location: IndexedPoint<N>,
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
}

impl<N: IndexableNum> KdNode<N> {
    /// The coordinate this node splits its subtree on.
    #[inline]
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// The point stored at this node.
    #[inline]
    pub fn location(&self) -> &IndexedPoint<N> {
        &self.location
    }

    /// Arena position of the left child.
    #[inline]
    pub fn left(&self) -> Option<usize> {
        self.left
    }

    /// Arena position of the right child.
    #[inline]
    pub fn right(&self) -> Option<usize> {
        self.right
    }
}

/// An immutable, balanced k-d tree.
///
/// Usually this will be created from scratch via [`KdTreeBuilder`] or [`KdTree::build`], or
/// restored from its text encoding with [`KdTree::from_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct KdTree<N: IndexableNum> {
    pub(crate) nodes: Vec<KdNode<N>>,
    pub(crate) dimension: usize,
}

impl<N: IndexableNum> KdTree<N> {
    /// Build a tree from a list of equal-length coordinate vectors, splitting with
    /// [`RoundRobin`].
    ///
    /// The dimension is taken from the first vector. An empty list gives an empty tree.
    pub fn build<P: AsRef<[N]>>(points: &[P]) -> Result<Self, KdTreeError> {
        let Some(first) = points.first() else {
            return Ok(Self::empty());
        };

        let mut builder = KdTreeBuilder::with_capacity(first.as_ref().len(), points.len());
        for point in points {
            builder.add(point.as_ref())?;
        }
        builder.finish::<RoundRobin>()
    }

    /// A tree without a root.
    pub fn empty() -> Self {
        Self {
            nodes: vec![],
            dimension: 0,
        }
    }

    /// Restore a tree from the text produced by [`KdTree::to_text`].
    pub fn from_text(text: &str) -> Result<Self, KdTreeError> {
        codec::decode(text.as_bytes())
    }

    /// Encode this tree as text.
    pub fn to_text(&self) -> String {
        codec::encode_to_string(self)
    }

    /// Consume the tree, returning its points in preorder.
    pub fn into_points(self) -> Vec<IndexedPoint<N>> {
        self.nodes.into_iter().map(|node| node.location).collect()
    }
}

impl<N: IndexableNum> Default for KdTree<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<N: IndexableNum> FromStr for KdTree<N> {
    type Err = KdTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}
