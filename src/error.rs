//! Error types for the model-checking numerical core.
//!
//! This module provides a unified error type [`PmcError`] that covers
//! all error conditions that can occur while building sparse matrices,
//! transforming them, and solving equation systems over them.

use thiserror::Error;

/// Result type alias using [`PmcError`].
pub type Result<T> = std::result::Result<T, PmcError>;

/// Unified error type for all matrix and solver operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PmcError {
    // ============ Construction Errors ============
    /// Entry position lies outside the declared dimensions
    #[error("Position ({row}, {column}) is out of bounds for a {rows}x{columns} matrix")]
    OutOfRange {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    /// Row index lies outside the matrix, for operations that take no column
    #[error("Row {row} is out of bounds for a matrix with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },

    /// Entries were not added in non-decreasing (row, column) order
    #[error("Entry ({row}, {column}) added after ({last_row}, {last_column}); entries must be added in row-major order")]
    OutOfOrder {
        row: usize,
        column: usize,
        last_row: usize,
        last_column: usize,
    },

    /// Operation is not allowed in the current lifecycle state of the matrix
    #[error("Illegal matrix state: {message}")]
    IllegalState { message: String },

    // ============ Transformation Errors ============
    /// Argument violates the precondition of an operation
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The matrix content does not permit the requested rewrite
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Vector length does not match the matrix dimension it is used with
    #[error("Dimension mismatch: expected length {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // ============ Solver Errors ============
    /// A state other than an absorbing one loops to itself with probability
    /// one, either in the input or after folding a closed cycle into it
    #[error("State {state} can never leave its closed set of states; the system is singular")]
    NonEscapingState { state: usize },

    /// The elimination graph lost track of an edge it must contain
    #[error("Elimination graph has no transition from {from} to {to}")]
    MissingTransition { from: usize, to: usize },
}

impl PmcError {
    /// Create an illegal state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Check a vector length against the expected dimension
    pub fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::DimensionMismatch { expected, actual })
        }
    }
}
