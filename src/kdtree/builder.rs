use std::cmp;

use tracing::debug;

use crate::error::{KdTreeError, Result};
use crate::kdtree::axis::AxisSelection;
use crate::kdtree::index::KdNode;
use crate::kdtree::{IndexedPoint, KdTree};
use crate::r#type::IndexableNum;

/// Subtrees with at least this many points build their halves on the rayon pool.
#[cfg(feature = "rayon")]
const PARALLEL_THRESHOLD: usize = 4096;

/// A builder to create a [`KdTree`].
#[derive(Debug, Clone)]
pub struct KdTreeBuilder<N: IndexableNum> {
    points: Vec<IndexedPoint<N>>,
    dimension: usize,
}

impl<N: IndexableNum> KdTreeBuilder<N> {
    /// Create a new builder for points with `dimension` coordinates.
    pub fn new(dimension: usize) -> Self {
        Self::with_capacity(dimension, 0)
    }

    /// Create a new builder with room for `num_items` points.
    pub fn with_capacity(dimension: usize, num_items: usize) -> Self {
        Self {
            points: Vec::with_capacity(num_items),
            dimension,
        }
    }

    /// The number of coordinates every point must have.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The number of points added so far.
    pub fn num_items(&self) -> usize {
        self.points.len()
    }

    /// Add a point to the index, returning its insertion index.
    pub fn add(&mut self, coords: &[N]) -> Result<u32> {
        if self.dimension == 0 {
            return Err(KdTreeError::ZeroDimension);
        }
        if coords.len() != self.dimension {
            return Err(KdTreeError::DimensionMismatch {
                expected: self.dimension,
                actual: coords.len(),
            });
        }

        let position = self.points.len();
        if coords.iter().any(|c| c.is_nan()) {
            return Err(KdTreeError::NotANumber { index: position });
        }
        let index =
            u32::try_from(position).map_err(|_| KdTreeError::TooManyPoints(position + 1))?;

        self.points.push(IndexedPoint::new(index, coords.to_vec()));
        Ok(index)
    }

    /// Consume this builder, partitioning the points into a balanced [`KdTree`] whose
    /// separating axes are chosen by `S`.
    ///
    /// No partially built tree is ever returned: if the node arena cannot be allocated the
    /// whole build fails.
    pub fn finish<S: AxisSelection<N>>(self) -> Result<KdTree<N>> {
        let Self {
            mut points,
            dimension,
        } = self;
        let num_items = points.len();
        if num_items == 0 {
            return Ok(KdTree::empty());
        }

        let mut links = Vec::new();
        links.try_reserve_exact(num_items)?;
        links.resize(num_items, Links::default());

        // kd-sort the points into preorder
        sort::<N, S>(&mut points, &mut links, None, dimension, 0);

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(num_items)?;
        nodes.extend(
            points
                .into_iter()
                .zip(links)
                .map(|(location, links)| KdNode {
                    axis: links.axis,
                    location,
                    left: links.left,
                    right: links.right,
                }),
        );

        debug!(num_items, dimension, "built kd-tree");
        Ok(KdTree { nodes, dimension })
    }
}

/// Per-node output of the partitioning pass, kept apart from the points so that both can be
/// split into disjoint halves.
#[derive(Debug, Clone, Copy, Default)]
struct Links {
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Rearrange `points` into the preorder layout of the subtree built from them, filling the
/// matching `links`. `offset` is the arena position of `points[0]`.
///
/// The median on the node's axis is selected into the middle, then swapped to the front. The
/// `m` points that were before the median (all `<=` it) follow it and form the left subtree,
/// the rest (all `>=` it) form the right subtree.
fn sort<N: IndexableNum, S: AxisSelection<N>>(
    points: &mut [IndexedPoint<N>],
    links: &mut [Links],
    parent_axis: Option<usize>,
    dimension: usize,
    offset: usize,
) {
    debug_assert_eq!(points.len(), links.len());
    let axis = S::select_axis(parent_axis, dimension, points);
    assert!(
        axis < dimension,
        "axis {axis} out of range for {dimension} coordinates"
    );
    let len = points.len();

    if len < 2 {
        links[0] = Links {
            axis,
            left: None,
            right: None,
        };
        return;
    }

    // middle index
    let m = len / 2;
    select(points, m, 0, len - 1, axis);
    points.swap(0, m);

    links[0] = Links {
        axis,
        left: Some(offset + 1),
        right: (len - m > 1).then_some(offset + 1 + m),
    };

    let (left_points, right_points) = points[1..].split_at_mut(m);
    let (left_links, right_links) = links[1..].split_at_mut(m);
    let left_offset = offset + 1;
    let right_offset = offset + 1 + m;

    #[cfg(feature = "rayon")]
    if len >= PARALLEL_THRESHOLD {
        rayon::join(
            || sort_child::<N, S>(left_points, left_links, axis, dimension, left_offset),
            || sort_child::<N, S>(right_points, right_links, axis, dimension, right_offset),
        );
        return;
    }

    sort_child::<N, S>(left_points, left_links, axis, dimension, left_offset);
    sort_child::<N, S>(right_points, right_links, axis, dimension, right_offset);
}

#[inline]
fn sort_child<N: IndexableNum, S: AxisSelection<N>>(
    points: &mut [IndexedPoint<N>],
    links: &mut [Links],
    parent_axis: usize,
    dimension: usize,
    offset: usize,
) {
    if !points.is_empty() {
        sort::<N, S>(points, links, Some(parent_axis), dimension, offset);
    }
}

/// Custom Floyd-Rivest selection algorithm: rearrange `points` so that the items in
/// `[left..k-1]` are not greater than the k-th item on `axis` and the items in `[k+1..right]`
/// are not smaller.
///
/// `k` must be at least 1.
#[inline]
fn select<N: IndexableNum>(
    points: &mut [IndexedPoint<N>],
    k: usize,
    mut left: usize,
    mut right: usize,
    axis: usize,
) {
    while right > left {
        if right - left > 600 {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = f64::ln(n);
            let s = 0.5 * f64::exp((2.0 * z) / 3.0);
            let sd = 0.5
                * f64::sqrt((z * s * (n - s)) / n)
                * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
            let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
            let new_right = cmp::min(
                right,
                f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
            );
            select(points, k, new_left, new_right, axis);
        }

        let t = points[k].coords[axis];
        let mut i = left;
        let mut j = right;

        points.swap(left, k);
        if points[right].coords[axis] > t {
            points.swap(left, right);
        }

        while i < j {
            points.swap(i, j);
            i += 1;
            j -= 1;
            while points[i].coords[axis] < t {
                i += 1;
            }
            while points[j].coords[axis] > t {
                j -= 1;
            }
        }

        if points[left].coords[axis] == t {
            points.swap(left, j);
        } else {
            j += 1;
            points.swap(j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            right = j - 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kdtree::RoundRobin;

    fn point(index: u32, x: f64) -> IndexedPoint<f64> {
        IndexedPoint::new(index, vec![x])
    }

    #[test]
    fn select_partitions_around_k() {
        let values = [9., 3., 7., 1., 8., 2., 6., 4., 5., 0., 3., 7.];
        for k in 1..values.len() {
            let mut points: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, &x)| point(i as u32, x))
                .collect();
            let last = points.len() - 1;
            select(&mut points, k, 0, last, 0);

            let mut sorted = values.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let pivot = points[k].coords[0];
            assert_eq!(pivot, sorted[k], "k-th element is in sorted position");
            assert!(points[..k].iter().all(|p| p.coords[0] <= pivot));
            assert!(points[k + 1..].iter().all(|p| p.coords[0] >= pivot));
        }
    }

    #[test]
    fn select_handles_large_ranges() {
        // Enough items to take the Floyd-Rivest sampling branch.
        let n = 2000;
        let mut points: Vec<_> = (0..n)
            .map(|i| point(i, ((i * 7919) % n) as f64))
            .collect();
        let k = n as usize / 2;
        select(&mut points, k, 0, n as usize - 1, 0);
        assert_eq!(points[k].coords[0], k as f64);
        assert!(points[..k].iter().all(|p| p.coords[0] <= k as f64));
        assert!(points[k + 1..].iter().all(|p| p.coords[0] >= k as f64));
    }

    #[test]
    fn select_with_all_keys_equal() {
        let mut points: Vec<_> = (0..50).map(|i| point(i, 1.)).collect();
        select(&mut points, 25, 0, 49, 0);
        let mut indices: Vec<_> = points.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..50).collect::<Vec<_>>(), "no point lost");
    }

    #[test]
    fn add_rejects_bad_points() {
        let mut builder = KdTreeBuilder::<f64>::new(2);
        assert_eq!(builder.add(&[1., 2.]).unwrap(), 0);
        assert!(matches!(
            builder.add(&[1., 2., 3.]),
            Err(KdTreeError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(matches!(
            builder.add(&[f64::NAN, 2.]),
            Err(KdTreeError::NotANumber { index: 1 })
        ));
        assert_eq!(builder.add(&[3., 4.]).unwrap(), 1);
        assert_eq!(builder.num_items(), 2);

        let mut builder = KdTreeBuilder::<f64>::new(0);
        assert!(matches!(builder.add(&[]), Err(KdTreeError::ZeroDimension)));
    }

    /// Always splits on the axis just past the last coordinate.
    struct PastLastAxis;

    impl AxisSelection<f64> for PastLastAxis {
        fn select_axis(
            _parent_axis: Option<usize>,
            dimension: usize,
            _points: &[IndexedPoint<f64>],
        ) -> usize {
            dimension
        }
    }

    #[test]
    #[should_panic(expected = "axis 2 out of range for 2 coordinates")]
    fn finish_rejects_out_of_range_axis() {
        // a single point never reaches `select`, so only the axis check can catch it
        let mut builder = KdTreeBuilder::<f64>::new(2);
        builder.add(&[1., 2.]).unwrap();
        let _ = builder.finish::<PastLastAxis>();
    }

    #[test]
    fn finish_writes_preorder_links() {
        let mut builder = KdTreeBuilder::<i32>::new(1);
        for x in [4, 1, 3, 0, 2] {
            builder.add(&[x]).unwrap();
        }
        let tree = builder.finish::<RoundRobin>().unwrap();

        // 5 points: median 2 at the root, left subtree {0, 1} in slots 1..3, right {3, 4} in 3..5
        let root = &tree.nodes[0];
        assert_eq!(root.location.coords, vec![2]);
        assert_eq!(root.left, Some(1));
        assert_eq!(root.right, Some(3));
        for (position, node) in tree.nodes.iter().enumerate() {
            assert_eq!(node.axis, 0);
            if let Some(left) = node.left {
                assert_eq!(left, position + 1);
            }
        }
    }
}
