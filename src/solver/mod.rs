//! State-elimination equation solver.
//!
//! This module solves the linear systems that arise in reachability and
//! expected-reward computations.
//!
//! ## State Elimination
//!
//! The solver is handed `A = I - P` and a right-hand side `b` and computes
//! the `x` with
//!
//! ```text
//! x = P x + b
//! ```
//!
//! It recovers `P`, builds the forward and backward adjacency of its
//! transition graph and removes states one at a time. Removing `s` with
//! self-loop `p` rescales its row by `1 / (1 - p)` and redirects every path
//! `u -> s -> t` to `u -> t`:
//!
//! ```text
//! w(u, t) += w(u, s) * w(s, t)
//! x[u]    += w(u, s) * x[s]
//! ```
//!
//! Eliminated states keep their outgoing edges, so each one keeps
//! collecting the contributions of its successors as those are removed and
//! no back-substitution pass is needed.
//!
//! The order in which states are removed is chosen by [`EliminationOrder`];
//! it changes fill-in and rounding but not the exact result.

mod diagnostics;
mod elimination;
mod eliminator;
mod order;

pub use diagnostics::{Diagnostics, NullDiagnostics, SolverEvent, TracingDiagnostics};
pub use elimination::{EliminationSettings, EliminationSolver, EliminationStats};
pub use eliminator::{StateEliminator, StepKind};
pub use order::{
    priority_queue, EliminationOrder, StatePriorityQueue, StaticStatePriorityQueue,
};

/// Elimination order used when none is configured.
pub const DEFAULT_ELIMINATION_ORDER: EliminationOrder = EliminationOrder::Forward;
