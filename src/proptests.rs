//! Property-based tests for sparse storage and state elimination.
