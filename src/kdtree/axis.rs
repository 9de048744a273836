use crate::kdtree::IndexedPoint;
use crate::r#type::IndexableNum;

/// Chooses the separating axis of each node while a tree is being built.
///
/// The strategy is picked as a type parameter of
/// [`KdTreeBuilder::finish`][crate::kdtree::KdTreeBuilder::finish]. Searching and decoding read
/// the stored axis of each node and never call the strategy, so any axis in `[0, dimension)` is
/// valid.
pub trait AxisSelection<N: IndexableNum> {
    /// The axis of a node whose parent split on `parent_axis` (`None` for the root), given the
    /// points the node's subtree is built from.
    ///
    /// The returned axis must be less than `dimension`. Building panics otherwise.
    fn select_axis(parent_axis: Option<usize>, dimension: usize, points: &[IndexedPoint<N>])
        -> usize;
}

/// Cycle through the axes with depth: the root splits on axis 0 and every child on the axis
/// after its parent's.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl<N: IndexableNum> AxisSelection<N> for RoundRobin {
    #[inline]
    fn select_axis(
        parent_axis: Option<usize>,
        dimension: usize,
        _points: &[IndexedPoint<N>],
    ) -> usize {
        parent_axis.map_or(0, |axis| (axis + 1) % dimension)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rotates_with_depth() {
        let axis = |parent, dimension| {
            <RoundRobin as AxisSelection<f64>>::select_axis(parent, dimension, &[])
        };
        assert_eq!(axis(None, 3), 0);
        assert_eq!(axis(Some(0), 3), 1);
        assert_eq!(axis(Some(1), 3), 2);
        assert_eq!(axis(Some(2), 3), 0);
        assert_eq!(axis(Some(0), 1), 0);
    }
}
