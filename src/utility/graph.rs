//! Graph algorithms over the transition relation of a matrix.
//!
//! An edge `u -> v` exists when row `u` stores a non-zero value at column
//! `v`. Stored zeros are ignored.

use std::collections::VecDeque;

use crate::error::Result;
use crate::storage::{BitVector, CompressedMatrix};
use crate::value::Value;

/// Marker for unreachable states in [`distances`].
pub const UNREACHABLE: usize = usize::MAX;

/// One representative state per bottom strongly-connected component.
///
/// The representative is the smallest state of its component. Uses an
/// iterative Tarjan traversal so deep chains do not exhaust the call stack.
pub fn bscc_cover<T: Value>(matrix: &CompressedMatrix<T>) -> Result<BitVector> {
    matrix.ensure_ready()?;
    let n = matrix.row_count();

    const UNVISITED: usize = usize::MAX;
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut component_of = vec![UNVISITED; n];
    let mut stack = Vec::new();
    let mut call: Vec<(usize, usize)> = Vec::new();
    let mut next_index = 0;
    let mut next_component = 0;
    let mut cover = BitVector::new(n, false);

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        call.push((root, 0));

        while let Some(&(state, cursor)) = call.last() {
            let row = matrix.row(state);
            if cursor < row.len() {
                let top = call.len() - 1;
                call[top].1 += 1;

                let successor = row.columns()[cursor];
                if row.values()[cursor].is_zero() || successor >= n {
                    continue;
                }
                if index[successor] == UNVISITED {
                    index[successor] = next_index;
                    lowlink[successor] = next_index;
                    next_index += 1;
                    stack.push(successor);
                    on_stack[successor] = true;
                    call.push((successor, 0));
                } else if on_stack[successor] {
                    lowlink[state] = lowlink[state].min(index[successor]);
                }
                continue;
            }

            call.pop();
            if let Some(&(parent, _)) = call.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[state]);
            }
            if lowlink[state] != index[state] {
                continue;
            }

            let mut component = Vec::new();
            while let Some(member) = stack.pop() {
                on_stack[member] = false;
                component_of[member] = next_component;
                component.push(member);
                if member == state {
                    break;
                }
            }

            // Components are closed in reverse topological order, so every
            // successor outside this one is already labeled.
            let bottom = component.iter().all(|&member| {
                successors(matrix, member)
                    .all(|successor| component_of.get(successor) == Some(&next_component))
            });
            if bottom {
                if let Some(&representative) = component.iter().min() {
                    cover.set(representative, true);
                }
            }
            next_component += 1;
        }
    }

    Ok(cover)
}

/// Breadth-first hop distance from the nearest state in `roots`.
///
/// Unreachable states get [`UNREACHABLE`].
pub fn distances<T: Value>(matrix: &CompressedMatrix<T>, roots: &BitVector) -> Result<Vec<usize>> {
    matrix.ensure_ready()?;
    let n = matrix.row_count();
    let mut distance = vec![UNREACHABLE; n];
    let mut queue = VecDeque::new();
    for root in roots.iter_ones().filter(|&r| r < n) {
        distance[root] = 0;
        queue.push_back(root);
    }

    while let Some(state) = queue.pop_front() {
        let next = distance[state] + 1;
        for successor in successors(matrix, state) {
            if successor < n && distance[successor] == UNREACHABLE {
                distance[successor] = next;
                queue.push_back(successor);
            }
        }
    }

    Ok(distance)
}

/// States whose entry in `values` is non-zero.
pub fn states_with_nonzero<T: Value>(values: &[T]) -> BitVector {
    BitVector::from_indices(
        values.len(),
        values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_zero())
            .map(|(state, _)| state),
    )
}

fn successors<T: Value>(
    matrix: &CompressedMatrix<T>,
    state: usize,
) -> impl Iterator<Item = usize> + '_ {
    matrix
        .row(state)
        .iter()
        .filter(|(_, value)| !value.is_zero())
        .map(|(column, _)| column)
}
