//! Fixtures shared by the unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `num_points` uniformly random points in `[-100, 100)^dimension`.
pub(crate) fn random_points(seed: u64, num_points: usize, dimension: usize) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_points)
        .map(|_| {
            (0..dimension)
                .map(|_| rng.gen_range(-100.0..100.0))
                .collect()
        })
        .collect()
}

/// Random points on a small integer grid, so that duplicates and equidistant points are common.
pub(crate) fn grid_points(seed: u64, num_points: usize, dimension: usize) -> Vec<Vec<i32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_points)
        .map(|_| (0..dimension).map(|_| rng.gen_range(-4..=4)).collect())
        .collect()
}
