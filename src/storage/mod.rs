//! Sparse storage for transition systems.
//!
//! This module provides the data structures the solvers work on:
//!
//! - [`CompressedMatrix`]: compressed-row storage built in one streaming
//!   pass, with optional row groups for nondeterministic choices
//! - [`EliminationGraph`]: mutable forward/backward adjacency used while
//!   states are eliminated
//! - [`BitVector`]: fixed-size state and row sets
//!
//! ## Layout
//!
//! ```text
//! row_starts:  [0,     2,  3,     5]
//! columns:     [0, 1,  2,  0, 2]
//! values:      [a, b,  c,  d, e]
//! ```
//!
//! Row `i` owns `row_starts[i]..row_starts[i + 1]`; the last offset is a
//! sentinel equal to the entry count. Row groups use the same offset scheme
//! over rows.

mod bit_vector;
mod flexible;
mod matrix;
mod ops;

pub use bit_vector::{BitVector, Ones};
pub use flexible::EliminationGraph;
pub use matrix::{CompressedMatrix, MatrixEntry, MatrixStatus, Rows, RowsMut};

/// Row count from which matrix-vector products are split across threads.
pub const PARALLEL_ROW_THRESHOLD: usize = 4096;
