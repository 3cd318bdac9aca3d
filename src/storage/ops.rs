//! Transformations and products over finalized compressed matrices.

use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "parallel")]
use super::PARALLEL_ROW_THRESHOLD;
use super::{BitVector, CompressedMatrix};
use crate::error::{PmcError, Result};
use crate::value::Value;

impl<T: Value> CompressedMatrix<T> {
    /// Transpose the matrix.
    ///
    /// Counts entries per target row, turns the counts into offsets and then
    /// scatters every entry through a per-row cursor, so the cost is linear in
    /// rows plus entries. All stored entries are carried over, including
    /// explicit zeros and negative values.
    pub fn transpose(&self) -> Result<Self> {
        self.ensure_ready()?;

        let rows = self.column_count;
        let entries = self.entry_count;
        let mut row_starts = vec![0usize; rows + 1];
        for &column in &self.columns[..entries] {
            row_starts[column + 1] += 1;
        }
        for i in 1..=rows {
            row_starts[i] += row_starts[i - 1];
        }

        let mut next_slot = row_starts.clone();
        let mut columns = vec![0usize; entries];
        let mut values = vec![T::zero(); entries];
        for row in 0..self.row_count {
            for (column, value) in self.row(row).iter() {
                let slot = next_slot[column];
                values[slot] = value.clone();
                columns[slot] = row;
                next_slot[column] += 1;
            }
        }

        Self::from_parts(self.row_count, row_starts, columns, values)
    }

    /// Turn a probability matrix `P` into the equation-system matrix `I - P`.
    ///
    /// Applying it twice restores the original matrix.
    pub fn convert_to_equation_system(&mut self) -> Result<()> {
        self.invert_diagonal()?;
        self.negate_all_non_diagonal_entries()
    }

    /// Replace every diagonal entry `v` with `1 - v`.
    ///
    /// Every row must store a (possibly zero) diagonal entry; the matrix is
    /// left untouched if one is missing.
    pub fn invert_diagonal(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.ensure_square("diagonal inversion")?;

        let positions = self.diagonal_positions()?;
        for position in positions {
            let inverted = T::one() - self.values[position].clone();
            self.values[position] = inverted;
        }
        Ok(())
    }

    /// Negate every entry that is not on the diagonal.
    pub fn negate_all_non_diagonal_entries(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.ensure_square("negation of off-diagonal entries")?;

        for row in 0..self.row_count {
            for i in self.row_starts[row]..self.row_starts[row + 1] {
                if self.columns[i] != row {
                    let negated = -self.values[i].clone();
                    self.values[i] = negated;
                }
            }
        }
        Ok(())
    }

    /// Split a square matrix into `(L + U, D^-1)`.
    pub fn jacobi_decomposition(&self) -> Result<(Self, Self)> {
        self.ensure_ready()?;
        self.ensure_square("Jacobi decomposition")?;

        let n = self.row_count;
        let mut off_diagonal = self.clone();
        let mut inverse_diagonal = Self::new(n, n, n);
        for (row, position) in self.diagonal_positions()?.into_iter().enumerate() {
            let diagonal = std::mem::replace(&mut off_diagonal.values[position], T::zero());
            if diagonal.is_zero() {
                return Err(PmcError::invalid_argument(format!(
                    "Jacobi decomposition requires a non-zero diagonal, row {row} has zero"
                )));
            }
            inverse_diagonal.add_next_value(row, row, T::one() / diagonal)?;
        }
        inverse_diagonal.finalize()?;

        Ok((off_diagonal, inverse_diagonal))
    }

    /// Restrict the matrix to the rows and columns in `mask`.
    ///
    /// Surviving columns are renumbered densely in ascending order.
    pub fn submatrix(&self, mask: &BitVector) -> Result<Self> {
        self.ensure_ready()?;
        if mask.is_empty() {
            return Err(PmcError::invalid_argument("cannot create an empty submatrix"));
        }
        if let Some(row) = mask.iter_ones().find(|&r| r >= self.row_count) {
            return Err(PmcError::RowOutOfRange {
                row,
                rows: self.row_count,
            });
        }

        let selection: Vec<(usize, Range<usize>)> =
            mask.iter_ones().map(|row| (row, row..row + 1)).collect();
        self.extract(&selection, mask, mask, false, false)
    }

    /// Restrict the matrix to the row groups in `group_mask` and the same set
    /// of columns.
    ///
    /// With `insert_diagonal`, every surviving row gets an explicit zero on the
    /// diagonal of its group if it stores none.
    pub fn submatrix_of_groups(
        &self,
        group_mask: &BitVector,
        insert_diagonal: bool,
    ) -> Result<Self> {
        self.submatrix_with_columns(group_mask, group_mask, insert_diagonal)
    }

    /// Restrict the matrix to the row groups in `group_mask` and the columns
    /// in `column_mask`.
    pub fn submatrix_with_columns(
        &self,
        group_mask: &BitVector,
        column_mask: &BitVector,
        insert_diagonal: bool,
    ) -> Result<Self> {
        self.ensure_ready()?;
        if group_mask.is_empty() {
            return Err(PmcError::invalid_argument("cannot create an empty submatrix"));
        }
        let group_count = self.row_group_count();
        if let Some(group) = group_mask.iter_ones().find(|&g| g >= group_count) {
            return Err(PmcError::RowOutOfRange {
                row: group,
                rows: group_count,
            });
        }

        let selection: Vec<(usize, Range<usize>)> = group_mask
            .iter_ones()
            .map(|group| (group, self.row_group_range(group)))
            .collect();
        let counted = if insert_diagonal {
            column_mask | group_mask
        } else {
            column_mask.clone()
        };
        let keep_groups = self.row_group_starts.is_some();
        self.extract(&selection, column_mask, &counted, insert_diagonal, keep_groups)
    }

    /// Pick one row out of every row group, as a scheduler does.
    ///
    /// `choices[g]` is the offset of the chosen row within group `g`. The
    /// result has one row per group and keeps the original columns.
    pub fn select_rows_from_groups(
        &self,
        choices: &[usize],
        insert_diagonal: bool,
    ) -> Result<Self> {
        self.ensure_ready()?;
        PmcError::check_len(self.row_group_count(), choices.len())?;

        let mut selection = Vec::with_capacity(choices.len());
        for (group, &choice) in choices.iter().enumerate() {
            let rows = self.row_group_range(group);
            if choice >= rows.len() {
                return Err(PmcError::invalid_argument(format!(
                    "choice {choice} does not exist in row group {group} with {} rows",
                    rows.len()
                )));
            }
            let row = rows.start + choice;
            selection.push((group, row..row + 1));
        }

        let all_columns = BitVector::new(self.column_count.max(self.row_group_count()), true);
        self.extract(&selection, &all_columns, &all_columns, insert_diagonal, false)
    }

    /// Copy the selected rows, keeping columns in `column_mask` and
    /// renumbering them by their rank in `counted`.
    ///
    /// Each selection item is `(diagonal index, source rows)`.
    fn extract(
        &self,
        selection: &[(usize, Range<usize>)],
        column_mask: &BitVector,
        counted: &BitVector,
        insert_diagonal: bool,
        keep_groups: bool,
    ) -> Result<Self> {
        let ranks = counted.rank_table();
        let column_count = counted.count_ones();

        let mut row_count = 0;
        let mut entry_count = 0;
        for (diagonal, rows) in selection {
            row_count += rows.len();
            for row in rows.clone() {
                let mut found_diagonal = false;
                for (column, _) in self.row(row).iter() {
                    if column_mask.get(column) {
                        entry_count += 1;
                        found_diagonal |= column == *diagonal;
                    }
                }
                if insert_diagonal && !found_diagonal {
                    entry_count += 1;
                }
            }
        }

        let mut result = Self::new(row_count, column_count, entry_count);
        let mut target_row = 0;
        for (diagonal, rows) in selection {
            if keep_groups {
                result.new_row_group(target_row)?;
            }
            for row in rows.clone() {
                let mut inserted_diagonal = false;
                for (column, value) in self.row(row).iter() {
                    if !column_mask.get(column) {
                        continue;
                    }
                    if column == *diagonal {
                        inserted_diagonal = true;
                    } else if insert_diagonal && !inserted_diagonal && column > *diagonal {
                        result.add_next_value(target_row, ranks[*diagonal], T::zero())?;
                        inserted_diagonal = true;
                    }
                    result.add_next_value(target_row, ranks[column], value.clone())?;
                }
                if insert_diagonal && !inserted_diagonal {
                    result.add_next_value(target_row, ranks[*diagonal], T::zero())?;
                }
                target_row += 1;
            }
        }

        result.finalize()?;
        Ok(result)
    }

    /// Rewrite `row` to hold exactly one entry of weight one at `column`.
    ///
    /// The row must currently store at least one entry whose slot is reused.
    pub fn make_row_absorbing(&mut self, row: usize, column: usize) -> Result<()> {
        self.ensure_ready()?;
        if row >= self.row_count {
            return Err(PmcError::OutOfRange {
                row,
                column,
                rows: self.row_count,
                columns: self.column_count,
            });
        }
        self.compact_absorbing(|r| (r == row).then_some(column))
    }

    /// Make every row in `rows` absorbing, looping on its own index.
    pub fn make_rows_absorbing(&mut self, rows: &BitVector) -> Result<()> {
        self.ensure_ready()?;
        if let Some(row) = rows.iter_ones().find(|&r| r >= self.row_count) {
            return Err(PmcError::OutOfRange {
                row,
                column: row,
                rows: self.row_count,
                columns: self.column_count,
            });
        }
        self.compact_absorbing(|r| rows.get(r).then_some(r))
    }

    /// Make every row of every group in `groups` absorbing, looping on the
    /// group index.
    pub fn make_row_groups_absorbing(&mut self, groups: &BitVector) -> Result<()> {
        self.ensure_ready()?;
        let group_count = self.row_group_count();
        if let Some(group) = groups.iter_ones().find(|&g| g >= group_count) {
            return Err(PmcError::OutOfRange {
                row: group,
                column: group,
                rows: group_count,
                columns: self.column_count,
            });
        }

        let mut targets = vec![None; self.row_count];
        for group in groups.iter_ones() {
            for row in self.row_group_range(group) {
                targets[row] = Some(group);
            }
        }
        self.compact_absorbing(|r| targets[r])
    }

    /// Single in-place pass that replaces every targeted row by one unit entry
    /// and slides the remaining entries down.
    fn compact_absorbing(&mut self, target: impl Fn(usize) -> Option<usize>) -> Result<()> {
        for row in 0..self.row_count {
            if let Some(column) = target(row) {
                if column >= self.column_count {
                    return Err(PmcError::OutOfRange {
                        row,
                        column,
                        rows: self.row_count,
                        columns: self.column_count,
                    });
                }
                if self.row_starts[row] == self.row_starts[row + 1] {
                    return Err(PmcError::invalid_state(format!(
                        "cannot make row {row} absorbing, it has no entries"
                    )));
                }
            }
        }

        let mut write = 0;
        let mut row_starts = Vec::with_capacity(self.row_count + 1);
        for row in 0..self.row_count {
            let (from, to) = (self.row_starts[row], self.row_starts[row + 1]);
            row_starts.push(write);
            match target(row) {
                Some(column) => {
                    self.values[write] = T::one();
                    self.columns[write] = column;
                    write += 1;
                }
                None => {
                    for read in from..to {
                        self.values.swap(write, read);
                        self.columns[write] = self.columns[read];
                        write += 1;
                    }
                }
            }
        }
        row_starts.push(write);

        self.values.truncate(write);
        self.columns.truncate(write);
        self.row_starts = row_starts;
        self.set_entry_count(write);
        Ok(())
    }

    /// Compute `result[r] = sum of row r times x`.
    ///
    /// With the `parallel` feature, matrices with at least
    /// `PARALLEL_ROW_THRESHOLD` rows are split across the rayon pool;
    /// each task writes only its own output rows.
    pub fn multiply_with_vector(&self, x: &[T], result: &mut [T]) -> Result<()> {
        self.ensure_ready()?;
        PmcError::check_len(self.column_count, x.len())?;
        PmcError::check_len(self.row_count, result.len())?;

        #[cfg(feature = "parallel")]
        if self.row_count >= PARALLEL_ROW_THRESHOLD {
            result
                .par_iter_mut()
                .enumerate()
                .for_each(|(row, out)| *out = self.row_dot(row, x));
            return Ok(());
        }

        for (row, out) in result.iter_mut().enumerate() {
            *out = self.row_dot(row, x);
        }
        Ok(())
    }

    fn row_dot(&self, row: usize, x: &[T]) -> T {
        self.row(row)
            .iter()
            .fold(T::zero(), |acc, (column, value)| acc + value.clone() * x[column].clone())
    }

    /// Sum of all entries in `row`.
    pub fn row_sum(&self, row: usize) -> Result<T> {
        self.ensure_row(row)?;
        Ok(self.sum_where(row, |_| true))
    }

    /// Sum of the entries in `row` whose column is in `columns`.
    pub fn constrained_row_sum(&self, row: usize, columns: &BitVector) -> Result<T> {
        self.ensure_row(row)?;
        Ok(self.sum_where(row, |column| columns.get(column)))
    }

    /// Constrained row sums for every row in `rows`, in ascending row order.
    pub fn constrained_row_sum_vector(
        &self,
        rows: &BitVector,
        columns: &BitVector,
    ) -> Result<Vec<T>> {
        self.ensure_ready()?;
        Ok(rows
            .iter_ones()
            .filter(|&row| row < self.row_count)
            .map(|row| self.sum_where(row, |column| columns.get(column)))
            .collect())
    }

    /// Constrained row sums for every row of every group in `groups`.
    pub fn constrained_row_group_sum_vector(
        &self,
        groups: &BitVector,
        columns: &BitVector,
    ) -> Result<Vec<T>> {
        self.ensure_ready()?;
        Ok(groups
            .iter_ones()
            .filter(|&group| group < self.row_group_count())
            .flat_map(|group| self.row_group_range(group))
            .map(|row| self.sum_where(row, |column| columns.get(column)))
            .collect())
    }

    fn ensure_row(&self, row: usize) -> Result<()> {
        self.ensure_ready()?;
        if row >= self.row_count {
            return Err(PmcError::RowOutOfRange {
                row,
                rows: self.row_count,
            });
        }
        Ok(())
    }

    fn sum_where(&self, row: usize, keep: impl Fn(usize) -> bool) -> T {
        self.row(row)
            .iter()
            .filter(|&(column, _)| keep(column))
            .fold(T::zero(), |acc, (_, value)| acc + value.clone())
    }

    /// Whether every stored position of `self` is also stored in `other`.
    ///
    /// Both matrices must be finalized, with column-sorted rows and equal
    /// dimensions; otherwise the answer is `false`.
    pub fn is_submatrix_of(&self, other: &Self) -> bool {
        if !self.is_ready() || !other.is_ready() {
            return false;
        }
        if self.row_count != other.row_count || self.column_count != other.column_count {
            return false;
        }
        (0..self.row_count).all(|row| {
            let mut theirs = other.row(row).columns().iter().peekable();
            self.row(row).columns().iter().all(|&column| {
                while theirs.next_if(|&&c| c < column).is_some() {}
                theirs.peek().is_some_and(|&&c| c == column)
            })
        })
    }

    /// Per row, the sum of pointwise products with `other`, whose pattern must
    /// be a subset of this matrix's pattern.
    pub fn pointwise_product_row_sum_vector(&self, other: &Self) -> Result<Vec<T>> {
        self.ensure_ready()?;
        other.ensure_ready()?;
        if !other.is_submatrix_of(self) {
            return Err(PmcError::invalid_argument(
                "pointwise product requires the other matrix to be a submatrix",
            ));
        }

        let sums = (0..self.row_count)
            .map(|row| {
                let mut mine = self.row(row).iter().peekable();
                other.row(row).iter().fold(T::zero(), |acc, (column, value)| {
                    while mine.next_if(|&(c, _)| c < column).is_some() {}
                    match mine.next() {
                        Some((_, own)) => acc + own.clone() * value.clone(),
                        None => acc,
                    }
                })
            })
            .collect();
        Ok(sums)
    }

    fn ensure_square(&self, operation: &str) -> Result<()> {
        if self.is_square() {
            Ok(())
        } else {
            Err(PmcError::invalid_argument(format!(
                "{operation} requires a square matrix, got {}x{}",
                self.row_count, self.column_count
            )))
        }
    }

    /// Storage position of the diagonal entry of every row.
    fn diagonal_positions(&self) -> Result<Vec<usize>> {
        (0..self.row_count)
            .map(|row| {
                let from = self.row_starts[row];
                self.columns[from..self.row_starts[row + 1]]
                    .iter()
                    .position(|&c| c == row)
                    .map(|offset| from + offset)
                    .ok_or_else(|| {
                        PmcError::invalid_argument(format!("row {row} has no diagonal entry"))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PARALLEL_ROW_THRESHOLD;
    use approx::assert_relative_eq;

    fn from_triplets(
        rows: usize,
        cols: usize,
        entries: &[(usize, usize, f64)],
    ) -> CompressedMatrix<f64> {
        let mut m = CompressedMatrix::new(rows, cols, entries.len());
        for &(r, c, v) in entries {
            m.add_next_value(r, c, v).unwrap();
        }
        m.finalize().unwrap();
        m
    }

    fn triplets(m: &CompressedMatrix<f64>) -> Vec<(usize, usize, f64)> {
        (0..m.row_count())
            .flat_map(|r| m.row(r).iter().map(move |(c, v)| (r, c, *v)).collect::<Vec<_>>())
            .collect()
    }

    fn chain() -> CompressedMatrix<f64> {
        from_triplets(
            3,
            3,
            &[
                (0, 0, 0.5),
                (0, 1, 0.25),
                (0, 2, 0.25),
                (1, 1, 0.0),
                (1, 2, 1.0),
                (2, 2, 1.0),
            ],
        )
    }

    #[test]
    fn test_transpose_keeps_all_entries() {
        let m = from_triplets(2, 3, &[(0, 0, 1.0), (0, 2, -2.0), (1, 1, 0.0), (1, 2, 3.0)]);
        let t = m.transpose().unwrap();
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.column_count(), 2);
        assert_eq!(
            triplets(&t),
            vec![(0, 0, 1.0), (1, 1, 0.0), (2, 0, -2.0), (2, 1, 3.0)]
        );
        assert_eq!(t.transpose().unwrap(), m);
    }

    #[test]
    fn test_transpose_requires_finalize() {
        let m: CompressedMatrix<f64> = CompressedMatrix::new(2, 2, 1);
        assert!(matches!(m.transpose(), Err(PmcError::IllegalState { .. })));
    }

    #[test]
    fn test_convert_to_equation_system() {
        let mut m = chain();
        let original = m.clone();
        m.convert_to_equation_system().unwrap();
        assert_eq!(
            triplets(&m),
            vec![
                (0, 0, 0.5),
                (0, 1, -0.25),
                (0, 2, -0.25),
                (1, 1, 1.0),
                (1, 2, -1.0),
                (2, 2, 0.0),
            ]
        );
        m.convert_to_equation_system().unwrap();
        assert_eq!(m, original);
    }

    #[test]
    fn test_invert_diagonal_missing_entry_leaves_matrix_untouched() {
        let mut m = from_triplets(2, 2, &[(0, 0, 0.5), (1, 0, 1.0)]);
        let before = m.clone();
        assert!(matches!(
            m.convert_to_equation_system(),
            Err(PmcError::InvalidArgument { .. })
        ));
        assert_eq!(m, before);
    }

    #[test]
    fn test_non_square_rejected() {
        let mut m = from_triplets(1, 2, &[(0, 0, 1.0)]);
        assert!(matches!(m.invert_diagonal(), Err(PmcError::InvalidArgument { .. })));
        assert!(matches!(m.jacobi_decomposition(), Err(PmcError::InvalidArgument { .. })));
    }

    #[test]
    fn test_submatrix_reindexes_columns() {
        let m = chain();
        let mask = BitVector::from_indices(3, [0, 2]);
        let sub = m.submatrix(&mask).unwrap();
        assert_eq!(sub.row_count(), 2);
        assert_eq!(sub.column_count(), 2);
        assert_eq!(triplets(&sub), vec![(0, 0, 0.5), (0, 1, 0.25), (1, 1, 1.0)]);
    }

    #[test]
    fn test_submatrix_empty_mask() {
        let m = chain();
        let mask = BitVector::new(3, false);
        assert!(matches!(m.submatrix(&mask), Err(PmcError::InvalidArgument { .. })));
        assert!(matches!(
            m.submatrix_of_groups(&mask, true),
            Err(PmcError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_submatrix_inserts_missing_diagonal() {
        let m = from_triplets(3, 3, &[(0, 2, 1.0), (1, 0, 0.5), (1, 2, 0.5), (2, 2, 1.0)]);
        let mask = BitVector::from_indices(3, [0, 1, 2]);
        let sub = m.submatrix_of_groups(&mask, true).unwrap();
        assert_eq!(
            triplets(&sub),
            vec![
                (0, 0, 0.0),
                (0, 2, 1.0),
                (1, 0, 0.5),
                (1, 1, 0.0),
                (1, 2, 0.5),
                (2, 2, 1.0),
            ]
        );
        assert!(m.is_submatrix_of(&sub));
    }

    #[test]
    fn test_submatrix_of_row_groups() {
        let mut m = CompressedMatrix::dynamic();
        m.new_row_group(0).unwrap();
        m.add_next_value(0, 0, 0.5).unwrap();
        m.add_next_value(0, 2, 0.5).unwrap();
        m.add_next_value(1, 1, 1.0).unwrap();
        m.new_row_group(2).unwrap();
        m.add_next_value(2, 2, 1.0).unwrap();
        m.new_row_group(3).unwrap();
        m.add_next_value(3, 0, 1.0).unwrap();
        m.finalize().unwrap();

        let groups = BitVector::from_indices(3, [0, 2]);
        let sub = m.submatrix_of_groups(&groups, true).unwrap();
        assert_eq!(sub.row_count(), 3);
        assert_eq!(sub.row_group_indices(), Some(&[0, 2, 3][..]));
        assert_eq!(
            triplets(&sub),
            vec![(0, 0, 0.5), (0, 1, 0.5), (1, 0, 0.0), (2, 0, 1.0), (2, 1, 0.0)]
        );
    }

    #[test]
    fn test_select_rows_from_groups() {
        let mut m = CompressedMatrix::dynamic();
        m.new_row_group(0).unwrap();
        m.add_next_value(0, 1, 1.0).unwrap();
        m.add_next_value(1, 0, 0.5).unwrap();
        m.add_next_value(1, 1, 0.5).unwrap();
        m.new_row_group(2).unwrap();
        m.add_next_value(2, 0, 1.0).unwrap();
        m.finalize().unwrap();

        let dtmc = m.select_rows_from_groups(&[0, 0], true).unwrap();
        assert_eq!(
            triplets(&dtmc),
            vec![(0, 0, 0.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 0.0)]
        );
        let dtmc = m.select_rows_from_groups(&[1, 0], false).unwrap();
        assert_eq!(triplets(&dtmc), vec![(0, 0, 0.5), (0, 1, 0.5), (1, 0, 1.0)]);
        assert!(m.select_rows_from_groups(&[2, 0], false).is_err());
        assert!(m.select_rows_from_groups(&[0], false).is_err());
    }

    #[test]
    fn test_make_row_absorbing() {
        let mut m = chain();
        m.make_row_absorbing(0, 1).unwrap();
        assert_eq!(
            triplets(&m),
            vec![(0, 1, 1.0), (1, 1, 0.0), (1, 2, 1.0), (2, 2, 1.0)]
        );
        assert_eq!(m.entry_count(), 4);
        assert_eq!(m.row_starts(), &[0, 1, 3, 4]);
    }

    #[test]
    fn test_make_row_absorbing_errors() {
        let mut m = from_triplets(2, 2, &[(0, 0, 1.0)]);
        assert!(matches!(
            m.make_row_absorbing(1, 1),
            Err(PmcError::InvalidState { .. })
        ));
        assert!(matches!(
            m.make_row_absorbing(2, 0),
            Err(PmcError::OutOfRange {
                row: 2,
                column: 0,
                rows: 2,
                columns: 2
            })
        ));
        assert!(matches!(
            m.make_row_absorbing(0, 5),
            Err(PmcError::OutOfRange { column: 5, .. })
        ));
        assert!(matches!(
            m.make_rows_absorbing(&BitVector::from_indices(4, [3])),
            Err(PmcError::OutOfRange { row: 3, .. })
        ));
        assert!(matches!(
            m.make_row_groups_absorbing(&BitVector::from_indices(4, [2])),
            Err(PmcError::OutOfRange { row: 2, .. })
        ));
        assert_eq!(m.row(0).values(), &[1.0][..]);
    }

    #[test]
    fn test_make_rows_and_groups_absorbing() {
        let mut m = chain();
        m.make_rows_absorbing(&BitVector::from_indices(3, [0, 1])).unwrap();
        assert_eq!(triplets(&m), vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)]);

        let mut m = CompressedMatrix::dynamic();
        m.new_row_group(0).unwrap();
        m.add_next_value(0, 1, 1.0).unwrap();
        m.add_next_value(1, 0, 0.5).unwrap();
        m.add_next_value(1, 1, 0.5).unwrap();
        m.new_row_group(2).unwrap();
        m.add_next_value(2, 0, 1.0).unwrap();
        m.finalize().unwrap();
        m.make_row_groups_absorbing(&BitVector::from_indices(2, [0])).unwrap();
        assert_eq!(triplets(&m), vec![(0, 0, 1.0), (1, 0, 1.0), (2, 0, 1.0)]);
    }

    #[test]
    fn test_multiply_with_vector() {
        let m = chain();
        let mut result = vec![0.0; 3];
        m.multiply_with_vector(&[1.0, 2.0, 4.0], &mut result).unwrap();
        assert_relative_eq!(result[0], 0.5 + 0.5 + 1.0);
        assert_relative_eq!(result[1], 4.0);
        assert_relative_eq!(result[2], 4.0);
        assert!(matches!(
            m.multiply_with_vector(&[1.0], &mut result),
            Err(PmcError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_multiply_large_matrix_matches_sequential_result() {
        let n = PARALLEL_ROW_THRESHOLD + 17;
        let mut m = CompressedMatrix::new(n, n, 2 * n - 1);
        for row in 0..n {
            m.add_next_value(row, row, 0.5).unwrap();
            if row + 1 < n {
                m.add_next_value(row, row + 1, 0.25).unwrap();
            }
        }
        m.finalize().unwrap();

        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut result = vec![0.0; n];
        m.multiply_with_vector(&x, &mut result).unwrap();
        for row in 0..n {
            let next = if row + 1 < n {
                0.25 * (row + 1) as f64
            } else {
                0.0
            };
            let expected = 0.5 * row as f64 + next;
            assert_relative_eq!(result[row], expected);
        }
    }

    #[test]
    fn test_jacobi_decomposition() {
        let m = from_triplets(2, 2, &[(0, 0, 4.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 5.0)]);
        let (lu, d_inv) = m.jacobi_decomposition().unwrap();
        assert_eq!(triplets(&lu), vec![(0, 0, 0.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 0.0)]);
        assert_eq!(triplets(&d_inv), vec![(0, 0, 0.25), (1, 1, 0.2)]);

        let zero_diag = from_triplets(1, 1, &[(0, 0, 0.0)]);
        assert!(zero_diag.jacobi_decomposition().is_err());
    }

    #[test]
    fn test_row_sums() {
        let m = chain();
        assert_relative_eq!(m.row_sum(0).unwrap(), 1.0);
        let columns = BitVector::from_indices(3, [2]);
        assert_relative_eq!(m.constrained_row_sum(0, &columns).unwrap(), 0.25);
        let rows = BitVector::from_indices(3, [0, 1]);
        assert_eq!(
            m.constrained_row_sum_vector(&rows, &columns).unwrap(),
            vec![0.25, 1.0]
        );
        assert_eq!(
            m.constrained_row_group_sum_vector(&rows, &columns).unwrap(),
            vec![0.25, 1.0]
        );
        assert!(matches!(
            m.row_sum(3),
            Err(PmcError::RowOutOfRange { row: 3, rows: 3 })
        ));
    }

    #[test]
    fn test_row_sums_require_finalized_matrix() {
        let mut m = CompressedMatrix::new(3, 3, 3);
        m.add_next_value(0, 0, 1.0).unwrap();
        m.add_next_value(1, 1, 1.0).unwrap();
        let all = BitVector::new(3, true);

        assert!(matches!(m.row_sum(0), Err(PmcError::IllegalState { .. })));
        assert!(matches!(
            m.constrained_row_sum(0, &all),
            Err(PmcError::IllegalState { .. })
        ));
        assert!(matches!(
            m.constrained_row_sum_vector(&all, &all),
            Err(PmcError::IllegalState { .. })
        ));
        assert!(matches!(
            m.constrained_row_group_sum_vector(&all, &all),
            Err(PmcError::IllegalState { .. })
        ));

        let finished = chain();
        assert!(!m.is_submatrix_of(&finished));
        assert!(!finished.is_submatrix_of(&m));
    }

    #[test]
    fn test_pointwise_product_row_sum_vector() {
        let m = chain();
        let rewards = from_triplets(3, 3, &[(0, 1, 4.0), (1, 2, 2.0)]);
        assert_eq!(
            m.pointwise_product_row_sum_vector(&rewards).unwrap(),
            vec![1.0, 2.0, 0.0]
        );
        let not_sub = from_triplets(3, 3, &[(2, 0, 1.0)]);
        assert!(m.pointwise_product_row_sum_vector(&not_sub).is_err());
    }
}
