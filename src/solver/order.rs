//! Elimination order policies and the queues that realize them.

use std::fmt;
use std::str::FromStr;

use crate::error::{PmcError, Result};
use crate::storage::CompressedMatrix;
use crate::utility::graph::{bscc_cover, distances, states_with_nonzero};
use crate::value::Value;

/// Sequence in which states are eliminated.
///
/// The order changes fill-in and rounding, never the exact solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EliminationOrder {
    /// Index order.
    Input,
    /// Nearest to the root states first.
    #[default]
    Forward,
    /// Farthest from the root states first.
    Reverse,
    /// Smallest sum of distance from the roots and distance to the targets first.
    Combined,
}

impl EliminationOrder {
    /// Every policy, in declaration order.
    pub const ALL: [EliminationOrder; 4] = [
        EliminationOrder::Input,
        EliminationOrder::Forward,
        EliminationOrder::Reverse,
        EliminationOrder::Combined,
    ];

    /// Whether the policy needs graph distances.
    pub fn needs_distances(self) -> bool {
        !matches!(self, EliminationOrder::Input)
    }
}

impl fmt::Display for EliminationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EliminationOrder::Input => "input",
            EliminationOrder::Forward => "forward",
            EliminationOrder::Reverse => "reverse",
            EliminationOrder::Combined => "combined",
        };
        f.write_str(name)
    }
}

impl FromStr for EliminationOrder {
    type Err = PmcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(EliminationOrder::Input),
            "forward" => Ok(EliminationOrder::Forward),
            "reverse" | "backward" => Ok(EliminationOrder::Reverse),
            "combined" => Ok(EliminationOrder::Combined),
            other => Err(PmcError::invalid_argument(format!(
                "unknown elimination order '{other}'"
            ))),
        }
    }
}

/// Pop-once source of states to eliminate.
pub trait StatePriorityQueue {
    /// Whether another state is pending.
    fn has_next(&self) -> bool;

    /// Next state, or `None` once every state was handed out.
    fn pop(&mut self) -> Option<usize>;
}

/// Queue over a sequence fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticStatePriorityQueue {
    states: Vec<usize>,
    position: usize,
}

impl StaticStatePriorityQueue {
    /// Hand out states in the given sequence.
    pub fn from_states(states: Vec<usize>) -> Self {
        Self { states, position: 0 }
    }

    /// Hand out `0..n` in index order.
    pub fn identity(n: usize) -> Self {
        Self::from_states((0..n).collect())
    }

    /// Hand out states by ascending priority, ties by ascending index.
    pub fn from_priorities(priorities: &[usize]) -> Self {
        let mut states: Vec<usize> = (0..priorities.len()).collect();
        states.sort_by_key(|&state| priorities[state]);
        Self::from_states(states)
    }

    /// Number of states not yet handed out.
    pub fn remaining(&self) -> usize {
        self.states.len() - self.position
    }
}

impl StatePriorityQueue for StaticStatePriorityQueue {
    fn has_next(&self) -> bool {
        self.position < self.states.len()
    }

    fn pop(&mut self) -> Option<usize> {
        let state = *self.states.get(self.position)?;
        self.position += 1;
        Some(state)
    }
}

/// Build the queue for `order` over the transition matrix `transitions`.
///
/// `backward` is the transpose of `transitions`. The root states are a
/// bottom SCC cover of `backward`, so every state is reachable from one of
/// them. Targets for [`EliminationOrder::Combined`] are the states with a
/// non-zero entry in `b`.
pub fn priority_queue<T: Value>(
    order: EliminationOrder,
    transitions: &CompressedMatrix<T>,
    backward: &CompressedMatrix<T>,
    b: &[T],
) -> Result<StaticStatePriorityQueue> {
    let n = transitions.row_count();
    PmcError::check_len(n, b.len())?;
    if !order.needs_distances() {
        return Ok(StaticStatePriorityQueue::identity(n));
    }

    let roots = bscc_cover(backward)?;
    let forward = distances(transitions, &roots)?;
    let priorities: Vec<usize> = match order {
        EliminationOrder::Input | EliminationOrder::Forward => forward,
        EliminationOrder::Reverse => forward.iter().map(|&d| usize::MAX - d).collect(),
        EliminationOrder::Combined => {
            let to_target = distances(backward, &states_with_nonzero(b))?;
            forward
                .iter()
                .zip(&to_target)
                .map(|(&from_root, &to_target)| from_root.saturating_add(to_target))
                .collect()
        }
    };

    Ok(StaticStatePriorityQueue::from_priorities(&priorities))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut queue: impl StatePriorityQueue) -> Vec<usize> {
        let mut states = Vec::new();
        while queue.has_next() {
            states.extend(queue.pop());
        }
        assert_eq!(queue.pop(), None);
        states
    }

    /// 2 -> 1 -> 0, with 0 absorbing.
    fn chain() -> (CompressedMatrix<f64>, CompressedMatrix<f64>) {
        let mut m = CompressedMatrix::new(3, 3, 3);
        m.add_next_value(0, 0, 1.0).unwrap();
        m.add_next_value(1, 0, 1.0).unwrap();
        m.add_next_value(2, 1, 1.0).unwrap();
        m.finalize().unwrap();
        let t = m.transpose().unwrap();
        (m, t)
    }

    #[test]
    fn test_static_queue_breaks_ties_by_index() {
        let queue = StaticStatePriorityQueue::from_priorities(&[2, 0, 2, 1]);
        assert_eq!(queue.remaining(), 4);
        assert_eq!(drain(queue), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_orders_on_chain() {
        let (m, t) = chain();
        let b = [1.0, 0.0, 0.0];
        let order = |order| drain(priority_queue(order, &m, &t, &b).unwrap());

        assert_eq!(order(EliminationOrder::Input), vec![0, 1, 2]);
        // The only root is the source state 2.
        assert_eq!(order(EliminationOrder::Forward), vec![2, 1, 0]);
        assert_eq!(order(EliminationOrder::Reverse), vec![0, 1, 2]);
        // Every state lies on the single root-to-target path.
        assert_eq!(order(EliminationOrder::Combined), vec![0, 1, 2]);
    }

    #[test]
    fn test_priority_queue_checks_rhs_length() {
        let (m, t) = chain();
        assert!(priority_queue(EliminationOrder::Forward, &m, &t, &[0.0]).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        for order in EliminationOrder::ALL {
            assert_eq!(order.to_string().parse::<EliminationOrder>().unwrap(), order);
        }
        assert_eq!("Backward".parse::<EliminationOrder>().unwrap(), EliminationOrder::Reverse);
        assert!("random".parse::<EliminationOrder>().is_err());
        assert_eq!(EliminationOrder::default(), EliminationOrder::Forward);
    }
}
