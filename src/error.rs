use std::collections::TryReserveError;
use std::fmt::Debug;

use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
pub enum KdTreeError {
    /// A point or query does not have the tree's number of coordinates.
    #[error("Expected {expected} coordinates, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Points must have at least one coordinate.
    #[error("Points must have at least one coordinate.")]
    ZeroDimension,

    /// A coordinate of the point at `index` is NaN.
    #[error("Point {index} has a NaN coordinate.")]
    NotANumber { index: usize },

    /// Indices are stored as `u32`.
    #[error("Cannot index {0} points, the maximum is {max}.", max = u32::MAX)]
    TooManyPoints(usize),

    /// The node arena could not be allocated.
    #[error("Failed to allocate tree nodes: {0}")]
    Allocation(#[from] TryReserveError),

    /// A line of an encoded tree could not be parsed.
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The encoded stream ended inside a subtree.
    #[error("Unexpected end of stream at line {line}.")]
    UnexpectedEof { line: usize },

    /// Non-blank content follows the encoded root subtree.
    #[error("Unexpected data after the encoded tree at line {line}.")]
    TrailingData { line: usize },

    /// A decoded node is inconsistent with the root.
    #[error("Line {line}: {message}")]
    InvalidNode { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KdTreeError>;
