//! Transition matrices of the two model shapes the solvers understand.
//!
//! A Markov chain has one row per state. A Markov decision process groups
//! one row per choice into a row group per state; a scheduler picks a row in
//! every group and turns it back into a chain.

use std::borrow::Cow;

use crate::error::{PmcError, Result};
use crate::solver::{EliminationSettings, EliminationSolver};
use crate::storage::{BitVector, CompressedMatrix};
use crate::utility::graph::{distances, UNREACHABLE};
use crate::value::Value;

/// A transition matrix tagged with its shape, decided once at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelMatrix<T> {
    /// One row per state.
    Deterministic(CompressedMatrix<T>),
    /// One row group per state, one row per choice.
    Nondeterministic(CompressedMatrix<T>),
}

impl<T: Value> ModelMatrix<T> {
    /// Classify a finalized transition matrix by its row grouping.
    pub fn from_matrix(matrix: CompressedMatrix<T>) -> Result<Self> {
        matrix.ensure_ready()?;
        if matrix.row_group_count() != matrix.column_count() {
            return Err(PmcError::invalid_argument(format!(
                "transition matrix has {} states but {} columns",
                matrix.row_group_count(),
                matrix.column_count()
            )));
        }
        if matrix.has_trivial_row_grouping() {
            Ok(Self::Deterministic(matrix))
        } else {
            Ok(Self::Nondeterministic(matrix))
        }
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &CompressedMatrix<T> {
        match self {
            Self::Deterministic(matrix) | Self::Nondeterministic(matrix) => matrix,
        }
    }

    /// Whether every state has exactly one choice.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::Deterministic(_))
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.matrix().row_group_count()
    }

    /// The state-to-state matrix under `scheduler`.
    ///
    /// A deterministic model is returned as is and only accepts a scheduler
    /// that picks choice zero everywhere. A nondeterministic model needs one.
    pub fn choice_matrix(
        &self,
        scheduler: Option<&[usize]>,
    ) -> Result<Cow<'_, CompressedMatrix<T>>> {
        match (self, scheduler) {
            (Self::Deterministic(matrix), None) => Ok(Cow::Borrowed(matrix)),
            (Self::Deterministic(matrix), Some(choices)) => {
                PmcError::check_len(matrix.row_count(), choices.len())?;
                if let Some(state) = choices.iter().position(|&choice| choice != 0) {
                    return Err(PmcError::invalid_argument(format!(
                        "state {state} of a deterministic model has no choice {}",
                        choices[state]
                    )));
                }
                Ok(Cow::Borrowed(matrix))
            }
            (Self::Nondeterministic(matrix), Some(choices)) => {
                Ok(Cow::Owned(matrix.select_rows_from_groups(choices, false)?))
            }
            (Self::Nondeterministic(_), None) => Err(PmcError::invalid_argument(
                "a nondeterministic model needs a scheduler",
            )),
        }
    }

    /// The system `(I - P_maybe, b)` for reaching `targets` through `maybe`.
    ///
    /// `P_maybe` is the chain under `scheduler` restricted to the `maybe`
    /// states, with a zero diagonal inserted where missing; `b[i]` is the
    /// one-step probability of the `i`-th maybe state to enter `targets`.
    pub fn reachability_system(
        &self,
        maybe: &BitVector,
        targets: &BitVector,
        scheduler: Option<&[usize]>,
    ) -> Result<(CompressedMatrix<T>, Vec<T>)> {
        let chain = self.choice_matrix(scheduler)?;
        equation_system(&chain, maybe, targets)
    }

    /// Probability of eventually reaching `targets` from every state.
    ///
    /// States that cannot reach `targets` get zero, targets get one, and the
    /// rest are solved by state elimination.
    pub fn reachability_probabilities(
        &self,
        targets: &BitVector,
        scheduler: Option<&[usize]>,
        settings: EliminationSettings,
    ) -> Result<Vec<T>> {
        let chain = self.choice_matrix(scheduler)?;
        let n = chain.row_count();
        let to_target = distances(&chain.transpose()?, targets)?;
        let maybe = BitVector::from_indices(
            n,
            (0..n).filter(|&state| !targets.get(state) && to_target[state] != UNREACHABLE),
        );

        let mut result = vec![T::zero(); n];
        for state in targets.iter_ones().filter(|&state| state < n) {
            result[state] = T::one();
        }
        if maybe.is_empty() {
            return Ok(result);
        }

        let (system, b) = equation_system(&chain, &maybe, targets)?;
        let mut x = vec![T::zero(); b.len()];
        EliminationSolver::from_owned(system)?
            .with_settings(settings)
            .solve_equation_system(&mut x, &b, None)?;
        for (state, value) in maybe.iter_ones().zip(x) {
            result[state] = value;
        }
        Ok(result)
    }
}

fn equation_system<T: Value>(
    chain: &CompressedMatrix<T>,
    maybe: &BitVector,
    targets: &BitVector,
) -> Result<(CompressedMatrix<T>, Vec<T>)> {
    let b = chain.constrained_row_sum_vector(maybe, targets)?;
    let mut system = chain.submatrix_of_groups(maybe, true)?;
    system.convert_to_equation_system()?;
    Ok((system, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::EliminationOrder;
    use approx::assert_relative_eq;

    fn dtmc() -> ModelMatrix<f64> {
        // 0 -> {1: 0.5, 2: 0.5}, 1 -> {0: 0.5, 3: 0.5}, 2 and 3 absorbing.
        let mut m = CompressedMatrix::new(4, 4, 6);
        m.add_next_value(0, 1, 0.5).unwrap();
        m.add_next_value(0, 2, 0.5).unwrap();
        m.add_next_value(1, 0, 0.5).unwrap();
        m.add_next_value(1, 3, 0.5).unwrap();
        m.add_next_value(2, 2, 1.0).unwrap();
        m.add_next_value(3, 3, 1.0).unwrap();
        m.finalize().unwrap();
        ModelMatrix::from_matrix(m).unwrap()
    }

    fn mdp() -> ModelMatrix<f64> {
        let mut m = CompressedMatrix::dynamic();
        m.new_row_group(0).unwrap();
        m.add_next_value(0, 1, 1.0).unwrap();
        m.add_next_value(1, 0, 0.5).unwrap();
        m.add_next_value(1, 2, 0.5).unwrap();
        m.new_row_group(2).unwrap();
        m.add_next_value(2, 1, 1.0).unwrap();
        m.new_row_group(3).unwrap();
        m.add_next_value(3, 2, 1.0).unwrap();
        m.finalize().unwrap();
        ModelMatrix::from_matrix(m).unwrap()
    }

    #[test]
    fn test_classification() {
        assert!(dtmc().is_deterministic());
        assert_eq!(dtmc().state_count(), 4);
        let mdp = mdp();
        assert!(!mdp.is_deterministic());
        assert_eq!(mdp.state_count(), 3);
        assert_eq!(mdp.matrix().row_count(), 4);

        let mut rect = CompressedMatrix::new(1, 2, 1);
        rect.add_next_value(0, 1, 1.0).unwrap();
        rect.finalize().unwrap();
        assert!(ModelMatrix::from_matrix(rect).is_err());
    }

    #[test]
    fn test_choice_matrix() {
        let mdp = mdp();
        assert!(mdp.choice_matrix(None).is_err());
        let chain = mdp.choice_matrix(Some(&[1, 0, 0])).unwrap();
        assert_eq!(chain.row_count(), 3);
        assert_eq!(chain.get_value(0, 2), Some(&0.5));

        let dtmc = dtmc();
        assert!(matches!(dtmc.choice_matrix(None).unwrap(), Cow::Borrowed(_)));
        assert!(dtmc.choice_matrix(Some(&[0, 0, 0, 0])).is_ok());
        assert!(dtmc.choice_matrix(Some(&[0, 1, 0, 0])).is_err());
    }

    #[test]
    fn test_reachability_system() {
        let maybe = BitVector::from_indices(4, [0, 1]);
        let targets = BitVector::from_indices(4, [2]);
        let (a, b) = dtmc().reachability_system(&maybe, &targets, None).unwrap();
        assert_eq!(a.row_count(), 2);
        assert_eq!(a.get_value(0, 0), Some(&1.0));
        assert_eq!(a.get_value(0, 1), Some(&-0.5));
        assert_eq!(a.get_value(1, 0), Some(&-0.5));
        assert_eq!(a.get_value(1, 1), Some(&1.0));
        assert_eq!(b, vec![0.5, 0.0]);
    }

    #[test]
    fn test_reachability_probabilities_dtmc() {
        let targets = BitVector::from_indices(4, [2]);
        for order in EliminationOrder::ALL {
            let settings = EliminationSettings::new().with_order(order);
            let x = dtmc()
                .reachability_probabilities(&targets, None, settings)
                .unwrap();
            // x0 = 0.5 x1 + 0.5, x1 = 0.5 x0
            assert_relative_eq!(x[0], 2.0 / 3.0, epsilon = 1e-12);
            assert_relative_eq!(x[1], 1.0 / 3.0, epsilon = 1e-12);
            assert_eq!(x[2], 1.0);
            assert_eq!(x[3], 0.0);
        }
    }

    #[test]
    fn test_reachability_probabilities_mdp() {
        let mdp = mdp();
        let targets = BitVector::from_indices(3, [2]);
        let settings = EliminationSettings::default();
        assert_eq!(
            mdp.reachability_probabilities(&targets, Some(&[0, 0, 0]), settings.clone())
                .unwrap(),
            vec![0.0, 0.0, 1.0]
        );
        let x = mdp
            .reachability_probabilities(&targets, Some(&[1, 0, 0]), settings)
            .unwrap();
        assert_relative_eq!(x[0], 1.0);
        assert_eq!(x[1], 0.0);
    }
}
