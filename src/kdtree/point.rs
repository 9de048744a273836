use crate::r#type::IndexableNum;

/// A coordinate vector tagged with its position in the input dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint<N: IndexableNum> {
    pub(crate) index: u32,
    pub(crate) coords: Vec<N>,
}

impl<N: IndexableNum> IndexedPoint<N> {
    /// Create a point with the given insertion index.
    pub fn new(index: u32, coords: Vec<N>) -> Self {
        Self { index, coords }
    }

    /// The insertion position of this point.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The coordinates of this point.
    #[inline]
    pub fn coords(&self) -> &[N] {
        &self.coords
    }

    /// The number of coordinates.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.coords.len()
    }

    /// Consume the point, returning its coordinates.
    pub fn into_coords(self) -> Vec<N> {
        self.coords
    }
}

/// Squared Euclidean distance between two equal-length coordinate slices.
///
/// Differences are taken in `f64` so unsigned and narrow integer types cannot overflow.
#[inline]
pub fn sq_dist<N: IndexableNum>(a: &[N], b: &[N]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&a, &b)| {
            let d = a.as_f64() - b.as_f64();
            d * d
        })
        .sum()
}
