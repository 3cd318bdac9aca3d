//! Graph and vector helpers used by the solvers.
//!
//! - [`graph`]: bottom SCC covers, hop distances and target detection over
//!   the transition graph of a [`CompressedMatrix`](crate::storage::CompressedMatrix)
//! - [`vector`]: dense vector arithmetic

pub mod graph;
pub mod vector;
