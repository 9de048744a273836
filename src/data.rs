//! Reading point lists from delimited text, and a linear-scan reference search.
//!
//! Each non-blank line holds one point whose coordinates are separated by commas, whitespace
//! or both. Every point must have as many coordinates as the first one.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::kdtree::sq_dist;
use crate::r#type::IndexableNum;

/// Errors while reading a point file.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No points found.")]
    Empty,

    #[error("Line {line}: invalid number {field:?}.")]
    InvalidNumber { line: usize, field: String },

    #[error("Line {line}: expected {expected} values, got {actual}.")]
    RaggedRow {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read one point per non-blank line.
pub fn read_points<N: IndexableNum, R: BufRead>(reader: R) -> Result<Vec<Vec<N>>, DataError> {
    let mut points: Vec<Vec<N>> = vec![];

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = i + 1;

        let point = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .map(|field| {
                field.parse::<N>().map_err(|_| DataError::InvalidNumber {
                    line: line_number,
                    field: field.to_string(),
                })
            })
            .collect::<Result<Vec<N>, _>>()?;
        if point.is_empty() {
            continue;
        }

        if let Some(first) = points.first() {
            if first.len() != point.len() {
                return Err(DataError::RaggedRow {
                    line: line_number,
                    expected: first.len(),
                    actual: point.len(),
                });
            }
        }
        points.push(point);
    }

    if points.is_empty() {
        return Err(DataError::Empty);
    }
    debug!(num_points = points.len(), dimension = points[0].len(), "read points");
    Ok(points)
}

/// Read the points of the file at `path`.
pub fn read_points_from_path<N: IndexableNum>(
    path: impl AsRef<Path>,
) -> Result<Vec<Vec<N>>, DataError> {
    let file = File::open(path)?;
    read_points(BufReader::new(file))
}

/// Find the point closest to `query` by checking every point.
///
/// Returns the lowest index among the points at the minimum squared distance, or `None` if
/// `points` is empty.
pub fn brute_force_nearest<N: IndexableNum, P: AsRef<[N]>>(
    points: &[P],
    query: &[N],
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, point) in points.iter().enumerate() {
        let dist = sq_dist(point.as_ref(), query);
        if best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((index, dist));
        }
    }
    best.map(|(index, _)| index)
}
