//! An implementation of an immutable, balanced K-D Tree over points of any fixed dimension.
//!
//! Trees are built once with [`KdTreeBuilder`] (or [`KdTree::build`]), answer exact
//! nearest-neighbor queries through [`KdTreeIndex`], and can be persisted with the text
//! encoding in [`codec`].

#![warn(missing_docs)]

mod axis;
mod builder;
pub mod codec;
mod index;
mod point;
mod r#trait;
pub mod traversal;

pub use axis::{AxisSelection, RoundRobin};
pub use builder::KdTreeBuilder;
pub use index::{KdNode, KdTree};
pub use point::{sq_dist, IndexedPoint};
pub use r#trait::{KdTreeIndex, Neighbor};
