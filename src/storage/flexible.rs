//! Mutable adjacency for state elimination.

use super::{CompressedMatrix, MatrixEntry};
use crate::error::{PmcError, Result};
use crate::value::Value;

/// Forward and backward adjacency of a square transition matrix that can be
/// rewritten edge by edge.
///
/// Both directions are kept as per-state vectors sorted by neighbor index.
/// `backward[t]` holds `(u, w)` exactly when `forward[u]` holds `(t, w)`, and
/// every mutator keeps the two sides in sync. Explicit zero entries of the
/// source matrix are not turned into edges.
#[derive(Debug, Clone, PartialEq)]
pub struct EliminationGraph<T> {
    forward: Vec<Vec<MatrixEntry<T>>>,
    backward: Vec<Vec<MatrixEntry<T>>>,
}

impl<T: Value> EliminationGraph<T> {
    /// Build the graph from a finalized matrix and its transpose.
    pub fn new(matrix: &CompressedMatrix<T>, transpose: &CompressedMatrix<T>) -> Result<Self> {
        matrix.ensure_ready()?;
        transpose.ensure_ready()?;
        if !matrix.is_square() {
            return Err(PmcError::invalid_argument(format!(
                "elimination graph requires a square matrix, got {}x{}",
                matrix.row_count(),
                matrix.column_count()
            )));
        }
        if transpose.row_count() != matrix.column_count()
            || transpose.column_count() != matrix.row_count()
            || transpose.entry_count() != matrix.entry_count()
        {
            return Err(PmcError::invalid_argument(
                "second matrix is not the transpose of the first",
            ));
        }

        Ok(Self {
            forward: Self::adjacency(matrix),
            backward: Self::adjacency(transpose),
        })
    }

    fn adjacency(matrix: &CompressedMatrix<T>) -> Vec<Vec<MatrixEntry<T>>> {
        matrix
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|(_, value)| !value.is_zero())
                    .map(|(column, value)| MatrixEntry::new(column, value.clone()))
                    .collect()
            })
            .collect()
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.forward.len()
    }

    /// Number of edges currently present.
    pub fn edge_count(&self) -> usize {
        self.forward.iter().map(Vec::len).sum()
    }

    /// Successors of `state` with their weights, sorted by successor.
    pub fn forward_neighbors(&self, state: usize) -> &[MatrixEntry<T>] {
        &self.forward[state]
    }

    /// Predecessors of `state` with the weights of their edges into it.
    pub fn backward_neighbors(&self, state: usize) -> &[MatrixEntry<T>] {
        &self.backward[state]
    }

    /// Weight of the edge `from -> to`, if present.
    pub fn weight(&self, from: usize, to: usize) -> Option<&T> {
        let row = &self.forward[from];
        row.binary_search_by_key(&to, |entry| entry.column)
            .ok()
            .map(|position| &row[position].value)
    }

    /// Add `delta` to the edge `from -> to`, creating the edge if needed.
    ///
    /// Returns `true` if a new edge was created.
    pub fn merge_edge(&mut self, from: usize, to: usize, delta: T) -> bool {
        let created = Self::merge_into(&mut self.forward[from], to, delta.clone());
        Self::merge_into(&mut self.backward[to], from, delta);
        created
    }

    fn merge_into(row: &mut Vec<MatrixEntry<T>>, column: usize, delta: T) -> bool {
        match row.binary_search_by_key(&column, |entry| entry.column) {
            Ok(position) => {
                let sum = row[position].value.clone() + delta;
                row[position].value = sum;
                false
            }
            Err(position) => {
                row.insert(position, MatrixEntry::new(column, delta));
                true
            }
        }
    }

    /// Remove the edge `from -> to` and return its weight.
    pub fn remove_edge(&mut self, from: usize, to: usize) -> Option<T> {
        let value = Self::remove_from(&mut self.forward[from], to)?;
        Self::remove_from(&mut self.backward[to], from);
        Some(value)
    }

    fn remove_from(row: &mut Vec<MatrixEntry<T>>, column: usize) -> Option<T> {
        let position = row.binary_search_by_key(&column, |entry| entry.column).ok()?;
        Some(row.remove(position).value)
    }

    /// Multiply every outgoing weight of `state` by `factor`.
    pub fn scale_forward(&mut self, state: usize, factor: &T) {
        for entry in &mut self.forward[state] {
            let scaled = entry.value.clone() * factor.clone();
            entry.value = scaled.clone();
            if let Ok(position) = self.backward[entry.column]
                .binary_search_by_key(&state, |back| back.column)
            {
                self.backward[entry.column][position].value = scaled;
            }
        }
    }

    /// Drop every outgoing edge of `state`.
    pub fn remove_forward_edges(&mut self, state: usize) {
        for entry in std::mem::take(&mut self.forward[state]) {
            Self::remove_from(&mut self.backward[entry.column], state);
        }
    }

    /// Drop every incoming edge of `state`.
    pub fn remove_backward_edges(&mut self, state: usize) {
        for entry in std::mem::take(&mut self.backward[state]) {
            Self::remove_from(&mut self.forward[entry.column], state);
        }
    }

    /// Disconnect `state` completely, in time linear in its degree.
    pub fn remove_state(&mut self, state: usize) {
        self.remove_forward_edges(state);
        self.remove_backward_edges(state);
    }
}
