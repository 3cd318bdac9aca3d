//! The single state-elimination step.

use crate::error::{PmcError, Result};
use crate::storage::{BitVector, EliminationGraph, MatrixEntry};
use crate::value::Value;

/// What eliminating a state found at that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// The state had escaping mass and its row was rescaled if needed.
    Transient,
    /// The state looped to itself with probability one from the start.
    Absorbing,
}

/// Folds states of an [`EliminationGraph`] into their predecessors while
/// accumulating the solution of `x = P x + b` in `values`.
///
/// `values` must start out as `b`. States whose only edge is a self-loop of
/// weight one when the eliminator is created are absorbing; a unit self-loop
/// that shows up on any other state means probability mass is trapped in a
/// closed cycle and the system is singular.
#[derive(Debug)]
pub struct StateEliminator<'a, T> {
    graph: &'a mut EliminationGraph<T>,
    values: &'a mut [T],
    absorbing: BitVector,
    fill_in: usize,
}

impl<'a, T: Value> StateEliminator<'a, T> {
    pub fn new(graph: &'a mut EliminationGraph<T>, values: &'a mut [T]) -> Result<Self> {
        PmcError::check_len(graph.state_count(), values.len())?;
        let absorbing = BitVector::from_indices(
            graph.state_count(),
            (0..graph.state_count()).filter(|&state| {
                matches!(
                    graph.forward_neighbors(state),
                    [entry] if entry.column == state && entry.value.is_one()
                )
            }),
        );
        Ok(Self {
            graph,
            values,
            absorbing,
            fill_in: 0,
        })
    }

    /// Edges created so far that did not exist before.
    pub fn fill_in(&self) -> usize {
        self.fill_in
    }

    /// Eliminate `state`.
    ///
    /// A self-loop `p` is removed and the remaining row and `values[state]`
    /// are scaled by `1 / (1 - p)`. Every predecessor `u` then loses its
    /// edge `u -> state` of weight `w`, receives `w * w_t` on each edge
    /// `u -> t` for the successors `t` of `state`, and gains `w * values[state]`.
    ///
    /// Edges into `state` are always removed. With `remove_forward` its
    /// outgoing edges go too; otherwise `state` stays a predecessor of its
    /// successors and keeps collecting their contributions when they are
    /// eliminated later.
    pub fn eliminate_state(&mut self, state: usize, remove_forward: bool) -> Result<StepKind> {
        let mut kind = StepKind::Transient;
        if let Some(self_loop) = self.graph.remove_edge(state, state) {
            if self_loop.is_one() {
                if !self.absorbing.get(state) || !self.graph.forward_neighbors(state).is_empty() {
                    return Err(PmcError::NonEscapingState { state });
                }
                kind = StepKind::Absorbing;
            } else {
                let scale = T::one() / (T::one() - self_loop);
                self.graph.scale_forward(state, &scale);
                let scaled = self.values[state].clone() * scale;
                self.values[state] = scaled;
            }
        }

        let successors: Vec<MatrixEntry<T>> = self.graph.forward_neighbors(state).to_vec();
        let predecessors: Vec<usize> = self
            .graph
            .backward_neighbors(state)
            .iter()
            .map(|entry| entry.column)
            .collect();

        for predecessor in predecessors {
            let weight = self
                .graph
                .remove_edge(predecessor, state)
                .ok_or(PmcError::MissingTransition {
                    from: predecessor,
                    to: state,
                })?;

            for successor in &successors {
                let delta = weight.clone() * successor.value.clone();
                if self.graph.merge_edge(predecessor, successor.column, delta) {
                    self.fill_in += 1;
                }
            }

            let contribution = weight * self.values[state].clone();
            let sum = self.values[predecessor].clone() + contribution;
            self.values[predecessor] = sum;
        }

        if remove_forward {
            self.graph.remove_forward_edges(state);
        }
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CompressedMatrix;
    use approx::assert_relative_eq;

    fn graph(n: usize, entries: &[(usize, usize, f64)]) -> EliminationGraph<f64> {
        let mut m = CompressedMatrix::new(n, n, entries.len());
        for &(r, c, v) in entries {
            m.add_next_value(r, c, v).unwrap();
        }
        m.finalize().unwrap();
        let t = m.transpose().unwrap();
        EliminationGraph::new(&m, &t).unwrap()
    }

    #[test]
    fn test_self_loop_is_rescaled() {
        let mut g = graph(2, &[(0, 0, 0.5), (0, 1, 0.5), (1, 1, 1.0)]);
        let mut x = vec![1.0, 0.0];
        let mut eliminator = StateEliminator::new(&mut g, &mut x).unwrap();
        assert_eq!(eliminator.eliminate_state(0, false).unwrap(), StepKind::Transient);
        assert_eq!(g.weight(0, 0), None);
        assert_eq!(g.weight(0, 1), Some(&1.0));
        assert_relative_eq!(x[0], 2.0);
    }

    #[test]
    fn test_predecessors_absorb_state() {
        // 0 -> 1 -> 2, eliminate the middle.
        let mut g = graph(3, &[(0, 1, 0.5), (1, 2, 0.25)]);
        let mut x = vec![0.0, 4.0, 1.0];
        let mut eliminator = StateEliminator::new(&mut g, &mut x).unwrap();
        eliminator.eliminate_state(1, false).unwrap();
        assert_eq!(eliminator.fill_in(), 1);

        assert_eq!(g.weight(0, 1), None);
        assert_eq!(g.weight(0, 2), Some(&0.125));
        // Forward edge kept, so state 1 still sees state 2.
        assert_eq!(g.weight(1, 2), Some(&0.25));
        assert_relative_eq!(x[0], 2.0);
    }

    #[test]
    fn test_remove_forward_edges() {
        let mut g = graph(3, &[(0, 1, 0.5), (1, 2, 0.25)]);
        let mut x = vec![0.0; 3];
        StateEliminator::new(&mut g, &mut x)
            .unwrap()
            .eliminate_state(1, true)
            .unwrap();
        assert!(g.forward_neighbors(1).is_empty());
        assert_eq!(g.backward_neighbors(2).len(), 1);
    }

    #[test]
    fn test_absorbing_state_keeps_value() {
        let mut g = graph(2, &[(0, 1, 0.5), (1, 1, 1.0)]);
        let mut x = vec![0.0, 1.0];
        let mut eliminator = StateEliminator::new(&mut g, &mut x).unwrap();
        assert_eq!(eliminator.eliminate_state(1, false).unwrap(), StepKind::Absorbing);
        assert_relative_eq!(x[1], 1.0);
        assert_relative_eq!(x[0], 0.5);
    }

    #[test]
    fn test_non_escaping_state_rejected() {
        let mut g = graph(2, &[(0, 0, 1.0), (0, 1, 0.5)]);
        let mut x = vec![0.0; 2];
        let mut eliminator = StateEliminator::new(&mut g, &mut x).unwrap();
        assert_eq!(
            eliminator.eliminate_state(0, false),
            Err(PmcError::NonEscapingState { state: 0 })
        );
    }

    #[test]
    fn test_closed_cycle_rejected() {
        // 0 <-> 1 with no way out: folding 0 into 1 leaves 1 with a unit
        // self-loop although it was never absorbing.
        let mut g = graph(2, &[(0, 1, 1.0), (1, 0, 1.0)]);
        let mut x = vec![1.0, 0.0];
        let mut eliminator = StateEliminator::new(&mut g, &mut x).unwrap();
        assert_eq!(eliminator.eliminate_state(0, false).unwrap(), StepKind::Transient);
        assert_eq!(
            eliminator.eliminate_state(1, false),
            Err(PmcError::NonEscapingState { state: 1 })
        );
    }

    #[test]
    fn test_length_mismatch() {
        let mut g = graph(2, &[(0, 1, 1.0)]);
        let mut x = vec![0.0];
        assert!(StateEliminator::new(&mut g, &mut x).is_err());
    }
}
