//! Linear equation solving by state elimination.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::{PmcError, Result};
use crate::storage::{CompressedMatrix, EliminationGraph};
use crate::utility::vector::add_vectors;
use crate::value::Value;

use super::diagnostics::{Diagnostics, SolverEvent, TracingDiagnostics};
use super::eliminator::{StateEliminator, StepKind};
use super::order::{priority_queue, StatePriorityQueue};
use super::{EliminationOrder, DEFAULT_ELIMINATION_ORDER};

/// Configuration for the elimination solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationSettings {
    /// Sequence in which states are eliminated.
    pub order: EliminationOrder,
}

impl Default for EliminationSettings {
    fn default() -> Self {
        Self {
            order: DEFAULT_ELIMINATION_ORDER,
        }
    }
}

impl EliminationSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the elimination order.
    pub fn with_order(mut self, order: EliminationOrder) -> Self {
        self.order = order;
        self
    }
}

/// Summary of one elimination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EliminationStats {
    /// States eliminated.
    pub eliminated: usize,
    /// Edges created between previously unconnected states.
    pub fill_in: usize,
}

/// Solves `A x = b` for `A = I - P` by eliminating the states of `P` one by
/// one.
///
/// The solver either borrows the caller's matrix or owns a moved-in one.
/// An owned matrix is converted back to `P` in place for the duration of a
/// solve and restored afterwards; a borrowed one is copied.
#[derive(Debug)]
pub struct EliminationSolver<'a, T: Value> {
    matrix: Cow<'a, CompressedMatrix<T>>,
    settings: EliminationSettings,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<'a, T: Value> EliminationSolver<'a, T> {
    /// Create a solver over a borrowed equation-system matrix.
    pub fn new(matrix: &'a CompressedMatrix<T>) -> Result<Self> {
        Self::from_cow(Cow::Borrowed(matrix))
    }

    /// Create a solver that owns its equation-system matrix.
    pub fn from_owned(matrix: CompressedMatrix<T>) -> Result<Self> {
        Self::from_cow(Cow::Owned(matrix))
    }

    fn from_cow(matrix: Cow<'a, CompressedMatrix<T>>) -> Result<Self> {
        matrix.ensure_ready()?;
        if !matrix.is_square() {
            return Err(PmcError::invalid_argument(format!(
                "equation solver requires a square matrix, got {}x{}",
                matrix.row_count(),
                matrix.column_count()
            )));
        }
        Ok(Self {
            matrix,
            settings: EliminationSettings::default(),
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: EliminationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &EliminationSettings {
        &self.settings
    }

    /// The equation-system matrix `A`.
    pub fn matrix(&self) -> &CompressedMatrix<T> {
        &self.matrix
    }

    /// Solve `A x = b`, writing the solution to `x`.
    ///
    /// `A` must store a diagonal entry in every row. `scratch` is accepted
    /// for interface compatibility with iterative solvers and left untouched.
    pub fn solve_equation_system(
        &mut self,
        x: &mut [T],
        b: &[T],
        scratch: Option<&mut Vec<T>>,
    ) -> Result<EliminationStats> {
        let n = self.matrix.row_count();
        PmcError::check_len(n, x.len())?;
        PmcError::check_len(n, b.len())?;
        if scratch.is_some() {
            self.diagnostics.record(SolverEvent::ScratchIgnored);
        }

        let order = self.settings.order;
        let diagnostics = self.diagnostics.as_ref();
        match &mut self.matrix {
            Cow::Owned(matrix) => {
                matrix.convert_to_equation_system()?;
                let result = eliminate(matrix, x, b, order, diagnostics);
                let restored = matrix.convert_to_equation_system();
                let stats = result?;
                restored?;
                Ok(stats)
            }
            Cow::Borrowed(matrix) => {
                let mut transitions = CompressedMatrix::clone(matrix);
                transitions.convert_to_equation_system()?;
                eliminate(&transitions, x, b, order, diagnostics)
            }
        }
    }

    /// Apply `x <- A x (+ b)` `n` times.
    ///
    /// The iterates alternate between `x` and the scratch buffer (or a local
    /// one) by swapping the vectors, so the result always ends up in `x`.
    pub fn perform_matrix_vector_multiplication(
        &self,
        x: &mut Vec<T>,
        b: Option<&[T]>,
        n: usize,
        scratch: Option<&mut Vec<T>>,
    ) -> Result<()> {
        PmcError::check_len(self.matrix.column_count(), x.len())?;
        if let Some(b) = b {
            PmcError::check_len(self.matrix.row_count(), b.len())?;
        }

        let mut local = Vec::new();
        let next = scratch.unwrap_or(&mut local);
        next.clear();
        next.resize(self.matrix.row_count(), T::zero());

        for _ in 0..n {
            self.multiply(x, next, b)?;
            std::mem::swap(x, next);
        }

        self.diagnostics
            .record(SolverEvent::MultiplicationFinished { iterations: n });
        Ok(())
    }

    /// Compute `result = A x (+ b)` once.
    pub fn multiply(&self, x: &[T], result: &mut [T], b: Option<&[T]>) -> Result<()> {
        self.matrix.multiply_with_vector(x, result)?;
        if let Some(b) = b {
            add_vectors(result, b)?;
        }
        Ok(())
    }

    /// Compute `x = A x (+ b)` once, through a temporary.
    pub fn multiply_in_place(&self, x: &mut Vec<T>, b: Option<&[T]>) -> Result<()> {
        let mut result = vec![T::zero(); self.matrix.row_count()];
        self.multiply(x, &mut result, b)?;
        *x = result;
        Ok(())
    }
}

/// Run the elimination on the probability matrix `transitions`.
fn eliminate<T: Value>(
    transitions: &CompressedMatrix<T>,
    x: &mut [T],
    b: &[T],
    order: EliminationOrder,
    diagnostics: &dyn Diagnostics,
) -> Result<EliminationStats> {
    let n = transitions.row_count();
    check_escaping(transitions)?;

    let backward = transitions.transpose()?;
    let mut graph = EliminationGraph::new(transitions, &backward)?;
    let mut queue = priority_queue(order, transitions, &backward, b)?;

    x.clone_from_slice(b);
    diagnostics.record(SolverEvent::EliminationStarted { states: n, order });

    let mut eliminator = StateEliminator::new(&mut graph, x)?;
    let mut eliminated = 0;
    while let Some(state) = queue.pop() {
        if eliminator.eliminate_state(state, false)? == StepKind::Absorbing {
            diagnostics.record(SolverEvent::AbsorbingStateFixed { state });
        }
        eliminated += 1;
    }

    let stats = EliminationStats {
        eliminated,
        fill_in: eliminator.fill_in(),
    };
    diagnostics.record(SolverEvent::EliminationFinished {
        eliminated: stats.eliminated,
        fill_in: stats.fill_in,
    });
    Ok(stats)
}

/// Reject states that loop to themselves with probability one but can also
/// leave.
fn check_escaping<T: Value>(transitions: &CompressedMatrix<T>) -> Result<()> {
    for state in 0..transitions.row_count() {
        let row = transitions.row(state);
        let certain_loop = row
            .iter()
            .any(|(column, value)| column == state && value.is_one());
        let leaves = row
            .iter()
            .any(|(column, value)| column != state && !value.is_zero());
        if certain_loop && leaves {
            return Err(PmcError::NonEscapingState { state });
        }
    }
    Ok(())
}
