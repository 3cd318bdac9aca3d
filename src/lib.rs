//! # PMC Core
//!
//! The numerical core of a probabilistic model checker.
//!
//! This library provides:
//! - Compressed sparse-row storage for Markov chains and Markov decision
//!   processes, with row groups for nondeterministic choices
//! - Matrix transformations used by model-checking algorithms (transpose,
//!   `I - P` conversion, submatrices, absorbing rewrites, Jacobi splitting)
//! - A state-elimination solver for the linear systems behind reachability
//!   and expected-reward queries
//! - Repeated matrix-vector multiplication for bounded properties
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`storage`] - Sparse matrices, state sets and the elimination graph
//! - [`solver`] - Elimination orders, the elimination step and the solver
//! - [`utility`] - Graph searches and dense vector helpers
//! - [`model`] - Deterministic vs. nondeterministic transition matrices
//!
//! ## Usage
//!
//! ```
//! use pmc_core::{CompressedMatrix, EliminationSolver};
//!
//! // P = [[0.5, 0.5], [0, 1]]
//! let mut matrix = CompressedMatrix::new(2, 2, 3);
//! matrix.add_next_value(0, 0, 0.5)?;
//! matrix.add_next_value(0, 1, 0.5)?;
//! matrix.add_next_value(1, 1, 1.0)?;
//! matrix.finalize()?;
//! matrix.convert_to_equation_system()?;
//!
//! let mut solver = EliminationSolver::new(&matrix)?;
//! let mut x = vec![0.0; 2];
//! solver.solve_equation_system(&mut x, &[0.0, 1.0], None)?;
//! assert_eq!(x, vec![1.0, 1.0]);
//! # Ok::<(), pmc_core::PmcError>(())
//! ```
//!
//! ## Parallelism
//!
//! With the default `parallel` feature, matrix-vector products over large
//! matrices are split across rows with rayon. Everything else runs on the
//! calling thread.

pub mod error;
pub mod model;
pub mod solver;
pub mod storage;
pub mod utility;
pub mod value;

mod proptests;

// Re-export main types for convenience
pub use error::{PmcError, Result};
pub use model::ModelMatrix;
pub use solver::{
    Diagnostics, EliminationOrder, EliminationSettings, EliminationSolver, EliminationStats,
};
pub use storage::{BitVector, CompressedMatrix, EliminationGraph};
pub use value::Value;
