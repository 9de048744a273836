use geo_traits::CoordTrait;
use tinyvec::TinyVec;

use crate::error::{KdTreeError, Result};
use crate::kdtree::index::KdNode;
use crate::kdtree::point::sq_dist;
use crate::kdtree::traversal::Node;
use crate::kdtree::{IndexedPoint, KdTree};
use crate::r#type::IndexableNum;

/// The result of a nearest-neighbor search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a, N: IndexableNum> {
    /// The closest indexed point.
    pub point: &'a IndexedPoint<N>,
    /// Squared Euclidean distance from the query to `point`.
    pub sqr_distance: f64,
}

impl<N: IndexableNum> Neighbor<'_, N> {
    /// The insertion index of the closest point.
    #[inline]
    pub fn index(&self) -> u32 {
        self.point.index
    }

    /// Euclidean distance from the query to the closest point.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.sqr_distance.sqrt()
    }
}

/// A trait for searching and accessing data out of a KdTree.
pub trait KdTreeIndex<N: IndexableNum>: Sized {
    /// The preorder node arena of this tree. The root, if any, is the first node.
    fn nodes(&self) -> &[KdNode<N>];

    /// The number of coordinates of every point, or `None` for an empty tree.
    fn dimension(&self) -> Option<usize>;

    /// The number of items in this KdTree
    fn num_items(&self) -> usize {
        self.nodes().len()
    }

    /// Returns `true` if this tree has no root.
    fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    /// Find the indexed point closest to `query` by Euclidean distance.
    ///
    /// Returns `Ok(None)` for an empty tree and an error if `query` does not have
    /// [`dimension`][KdTreeIndex::dimension] coordinates. Among points at the same distance the
    /// one with the lowest insertion index is returned.
    ///
    /// ```
    /// use kd_nearest::kdtree::{KdTree, KdTreeIndex};
    ///
    /// let tree = KdTree::<f64>::build(&[[0., 0.], [1., 1.], [2., 2.], [3., 3.]]).unwrap();
    /// let nearest = tree.nearest_neighbor(&[2.4, 2.4]).unwrap().unwrap();
    /// assert_eq!(nearest.index(), 2);
    /// assert_eq!(nearest.point.coords(), &[2., 2.]);
    /// ```
    fn nearest_neighbor(&self, query: &[N]) -> Result<Option<Neighbor<'_, N>>> {
        let nodes = self.nodes();
        let Some(dimension) = self.dimension() else {
            return Ok(None);
        };
        if query.len() != dimension {
            return Err(KdTreeError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let mut best: Option<Neighbor<'_, N>> = None;

        // Use TinyVec to avoid heap allocations for balanced trees
        let mut stack: TinyVec<[Visit; 64]> = TinyVec::new();
        stack.push(Visit::Enter(0));

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    let node = &nodes[id];
                    let location = &node.location;

                    // if the point at this node is closer than our current best, make it the best
                    let sqr_distance = sq_dist(&location.coords, query);
                    if is_better(sqr_distance, location.index, best.as_ref()) {
                        best = Some(Neighbor {
                            point: location,
                            sqr_distance,
                        });
                    }

                    // descend on the query's side of the splitting plane first; the other side
                    // is decided once that subtree is exhausted
                    let near = if query[node.axis] <= location.coords[node.axis] {
                        Side::Left
                    } else {
                        Side::Right
                    };
                    // Note: these are pushed in backwards order to what gets popped
                    stack.push(Visit::Bound(id, near));
                    if let Some(child) = near.child(node) {
                        stack.push(Visit::Enter(child));
                    }
                }
                Visit::Bound(id, near) => {
                    let node = &nodes[id];
                    let Some(far) = near.opposite().child(node) else {
                        continue;
                    };

                    // the splitting plane is within the best-distance hypersphere, so the other
                    // side may still hold a closer point
                    let plane_dist =
                        query[node.axis].as_f64() - node.location.coords[node.axis].as_f64();
                    let within = best
                        .as_ref()
                        .map_or(true, |best| plane_dist * plane_dist <= best.sqr_distance);
                    if within {
                        stack.push(Visit::Enter(far));
                    }
                }
            }
        }

        Ok(best)
    }

    /// Find the indexed point closest to a coordinate.
    ///
    /// The coordinate's own dimension (2, 3 or 4 for `geo-traits` coordinates) must match the
    /// tree's.
    fn nearest_neighbor_coord(
        &self,
        coord: &impl CoordTrait<T = N>,
    ) -> Result<Option<Neighbor<'_, N>>> {
        let query: Vec<N> = (0..coord.dim().size())
            .map(|n| coord.nth_or_panic(n))
            .collect();
        self.nearest_neighbor(&query)
    }

    /// Access the root node of the KdTree for manual traversal.
    fn root(&self) -> Option<Node<'_, N>> {
        Node::from_root(self.nodes())
    }
}

impl<N: IndexableNum> KdTreeIndex<N> for KdTree<N> {
    fn nodes(&self) -> &[KdNode<N>] {
        &self.nodes
    }

    fn dimension(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(self.dimension)
    }
}

/// A pending step of the nearest-neighbor traversal.
#[derive(Debug, Clone, Copy)]
enum Visit {
    /// Evaluate a node and descend on the query's side.
    Enter(usize),
    /// The near side of a node is done; test whether the far side can be pruned.
    Bound(usize, Side),
}

impl Default for Visit {
    fn default() -> Self {
        Self::Enter(0)
    }
}

/// The side of a splitting plane the query lies on, searched first.
#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    fn child<N: IndexableNum>(self, node: &KdNode<N>) -> Option<usize> {
        match self {
            Self::Left => node.left,
            Self::Right => node.right,
        }
    }

    #[inline]
    fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Lower distance wins, ties go to the lower insertion index.
#[inline]
fn is_better<N: IndexableNum>(
    sqr_distance: f64,
    index: u32,
    best: Option<&Neighbor<'_, N>>,
) -> bool {
    match best {
        None => true,
        Some(best) => {
            sqr_distance < best.sqr_distance
                || (sqr_distance == best.sqr_distance && index < best.point.index)
        }
    }
}
