//! Compressed-row sparse matrix with a streaming construction protocol.

use std::fmt;

use crate::error::{PmcError, Result};
use crate::value::Value;

/// Lifecycle state of a [`CompressedMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixStatus {
    /// Entries may still be appended.
    Building,
    /// Finalized; read and compute operations are allowed.
    Ready,
}

/// A single owned matrix entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixEntry<T> {
    /// Column index
    pub column: usize,
    /// Stored value
    pub value: T,
}

impl<T> MatrixEntry<T> {
    /// Create a new entry.
    pub fn new(column: usize, value: T) -> Self {
        Self { column, value }
    }
}

/// Compressed sparse row matrix.
///
/// Entries are appended with [`add_next_value`](Self::add_next_value) in
/// non-decreasing `(row, column)` order and the matrix becomes usable after
/// [`finalize`](Self::finalize). If rows, columns and entries are all known
/// up front the storage is preallocated and the entry count is checked at
/// finalization; otherwise the arrays grow as entries arrive.
///
/// Row `i` occupies `row_starts[i]..row_starts[i + 1]` of `values` and
/// `columns`. Optional row groups partition the rows into consecutive blocks,
/// one per state, with one row per nondeterministic choice.
#[derive(Debug, Clone)]
pub struct CompressedMatrix<T> {
    pub(crate) row_count: usize,
    pub(crate) column_count: usize,
    pub(crate) entry_count: usize,
    pub(crate) values: Vec<T>,
    pub(crate) columns: Vec<usize>,
    pub(crate) row_starts: Vec<usize>,
    pub(crate) row_group_starts: Option<Vec<usize>>,
    preallocated: bool,
    status: MatrixStatus,
    current_entry_count: usize,
    last_row: usize,
    last_column: usize,
}

impl<T: Value> CompressedMatrix<T> {
    /// Create a matrix under construction.
    ///
    /// Passing zero for any of `rows`, `columns` or `entries` selects the
    /// dynamic mode in which the arrays grow on demand and the dimensions are
    /// extended to cover every inserted entry.
    pub fn new(rows: usize, columns: usize, entries: usize) -> Self {
        let preallocated = rows != 0 && columns != 0 && entries != 0;
        let (values, column_storage, row_starts) = if preallocated {
            (
                vec![T::zero(); entries],
                vec![0; entries],
                vec![0; rows + 1],
            )
        } else {
            let mut starts = Vec::with_capacity(rows + 1);
            starts.push(0);
            (
                Vec::with_capacity(entries),
                Vec::with_capacity(entries),
                starts,
            )
        };

        Self {
            row_count: rows,
            column_count: columns,
            entry_count: entries,
            values,
            columns: column_storage,
            row_starts,
            row_group_starts: None,
            preallocated,
            status: MatrixStatus::Building,
            current_entry_count: 0,
            last_row: 0,
            last_column: 0,
        }
    }

    /// Create a square matrix under construction.
    pub fn square(size: usize, entries: usize) -> Self {
        Self::new(size, size, entries)
    }

    /// Create a dynamically growing matrix with unknown dimensions.
    pub fn dynamic() -> Self {
        Self::new(0, 0, 0)
    }

    /// Assemble a ready matrix from already-built compressed arrays.
    pub fn from_parts(
        column_count: usize,
        row_starts: Vec<usize>,
        columns: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        if row_starts.is_empty() {
            return Err(PmcError::invalid_argument(
                "row offsets must contain at least the sentinel entry",
            ));
        }
        if columns.len() != values.len() {
            return Err(PmcError::invalid_argument(format!(
                "{} column indices for {} values",
                columns.len(),
                values.len()
            )));
        }
        if row_starts[0] != 0
            || row_starts.windows(2).any(|w| w[0] > w[1])
            || row_starts[row_starts.len() - 1] != values.len()
        {
            return Err(PmcError::invalid_argument(
                "row offsets must start at zero, be non-decreasing and end at the entry count",
            ));
        }
        if let Some(&column) = columns.iter().find(|&&c| c >= column_count) {
            return Err(PmcError::invalid_argument(format!(
                "column {column} exceeds column count {column_count}"
            )));
        }

        let row_count = row_starts.len() - 1;
        let entry_count = values.len();
        Ok(Self {
            row_count,
            column_count,
            entry_count,
            values,
            columns,
            row_starts,
            row_group_starts: None,
            preallocated: true,
            status: MatrixStatus::Ready,
            current_entry_count: entry_count,
            last_row: row_count.saturating_sub(1),
            last_column: 0,
        })
    }

    /// Create a ready identity matrix of size `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            row_count: n,
            column_count: n,
            entry_count: n,
            values: (0..n).map(|_| T::one()).collect(),
            columns: (0..n).collect(),
            row_starts: (0..=n).collect(),
            row_group_starts: None,
            preallocated: true,
            status: MatrixStatus::Ready,
            current_entry_count: n,
            last_row: n.saturating_sub(1),
            last_column: n.saturating_sub(1),
        }
    }

    /// Append the next entry.
    ///
    /// Entries must arrive in non-decreasing `(row, column)` order.
    pub fn add_next_value(&mut self, row: usize, column: usize, value: T) -> Result<()> {
        if self.status == MatrixStatus::Ready {
            return Err(PmcError::illegal_state(
                "cannot add entries to a finalized matrix",
            ));
        }

        if self.preallocated {
            if row >= self.row_count || column >= self.column_count {
                return Err(PmcError::OutOfRange {
                    row,
                    column,
                    rows: self.row_count,
                    columns: self.column_count,
                });
            }
            if self.current_entry_count >= self.entry_count {
                return Err(PmcError::illegal_state(format!(
                    "matrix was declared with {} entries and is already full",
                    self.entry_count
                )));
            }
        }

        if row < self.last_row || (row == self.last_row && column < self.last_column) {
            return Err(PmcError::OutOfOrder {
                row,
                column,
                last_row: self.last_row,
                last_column: self.last_column,
            });
        }

        // Rows skipped since the last insertion start (and end) here.
        if row != self.last_row {
            self.fill_row_starts(self.last_row + 1, row + 1);
            self.last_row = row;
        }
        self.last_column = column;

        if self.preallocated {
            self.values[self.current_entry_count] = value;
            self.columns[self.current_entry_count] = column;
        } else {
            self.values.push(value);
            self.columns.push(column);
            self.row_count = self.row_count.max(row + 1);
            self.column_count = self.column_count.max(column + 1);
        }
        self.current_entry_count += 1;

        Ok(())
    }

    /// Open a new row group starting at `start_row`.
    ///
    /// Group starts must be non-decreasing and must not lie before the row of
    /// the last inserted entry.
    pub fn new_row_group(&mut self, start_row: usize) -> Result<()> {
        if self.status == MatrixStatus::Ready {
            return Err(PmcError::illegal_state(
                "cannot open row groups on a finalized matrix",
            ));
        }
        if self.preallocated && start_row > self.row_count {
            return Err(PmcError::RowOutOfRange {
                row: start_row,
                rows: self.row_count,
            });
        }
        if self.current_entry_count > 0 && start_row < self.last_row {
            return Err(PmcError::OutOfOrder {
                row: start_row,
                column: 0,
                last_row: self.last_row,
                last_column: self.last_column,
            });
        }
        let groups = self.row_group_starts.get_or_insert_with(Vec::new);
        if let Some(&previous) = groups.last() {
            if start_row < previous {
                return Err(PmcError::invalid_argument(format!(
                    "row group starting at {start_row} precedes the group starting at {previous}"
                )));
            }
        }
        groups.push(start_row);
        Ok(())
    }

    /// Close construction.
    ///
    /// Back-fills the offsets of trailing empty rows and writes the sentinel
    /// `row_starts[row_count] == entry_count`.
    pub fn finalize(&mut self) -> Result<()> {
        if self.status == MatrixStatus::Ready {
            return Err(PmcError::illegal_state("matrix is already finalized"));
        }
        if self.preallocated && self.current_entry_count != self.entry_count {
            return Err(PmcError::illegal_state(format!(
                "expected {} entries, but got {}",
                self.entry_count, self.current_entry_count
            )));
        }
        if !self.preallocated {
            self.entry_count = self.current_entry_count;
        }

        // Trailing row groups without entries still own their (empty) rows.
        if let Some(&last) = self.row_group_starts.as_ref().and_then(|g| g.last()) {
            if last > self.row_count {
                if self.preallocated {
                    return Err(PmcError::RowOutOfRange {
                        row: last,
                        rows: self.row_count,
                    });
                }
                self.row_count = last;
            }
        }

        self.fill_row_starts(self.last_row + 1, self.row_count);
        if self.preallocated {
            self.row_starts[self.row_count] = self.entry_count;
        } else if self.row_count == 0 {
            self.row_starts = vec![self.entry_count];
        } else {
            self.row_starts.truncate(self.row_count);
            self.row_starts.push(self.entry_count);
        }

        if let Some(groups) = self.row_group_starts.as_mut() {
            if groups.first() != Some(&0) {
                groups.insert(0, 0);
            }
            groups.push(self.row_count);
        }

        self.status = MatrixStatus::Ready;
        Ok(())
    }

    fn fill_row_starts(&mut self, from: usize, to: usize) {
        for row in from..to {
            if self.preallocated {
                self.row_starts[row] = self.current_entry_count;
            } else if self.row_starts.len() == row {
                self.row_starts.push(self.current_entry_count);
            }
        }
    }

    /// Record a new entry count after an in-place rewrite shrank the storage.
    pub(crate) fn set_entry_count(&mut self, entries: usize) {
        self.entry_count = entries;
        self.current_entry_count = entries;
    }

    /// Fail with [`PmcError::IllegalState`] unless the matrix is finalized.
    pub fn ensure_ready(&self) -> Result<()> {
        match self.status {
            MatrixStatus::Ready => Ok(()),
            MatrixStatus::Building => Err(PmcError::illegal_state(
                "matrix must be finalized before use",
            )),
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> MatrixStatus {
        self.status
    }

    /// Whether [`finalize`](Self::finalize) has completed.
    pub fn is_ready(&self) -> bool {
        self.status == MatrixStatus::Ready
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Whether the matrix has as many rows as columns.
    pub fn is_square(&self) -> bool {
        self.row_count == self.column_count
    }

    /// Row offsets, including the sentinel.
    pub fn row_starts(&self) -> &[usize] {
        &self.row_starts
    }

    /// Row group offsets, including the sentinel, if the matrix has row groups.
    pub fn row_group_indices(&self) -> Option<&[usize]> {
        self.row_group_starts.as_deref()
    }

    /// Number of row groups; every row is its own group without explicit grouping.
    pub fn row_group_count(&self) -> usize {
        match &self.row_group_starts {
            Some(groups) => groups.len().saturating_sub(1),
            None => self.row_count,
        }
    }

    /// Rows belonging to `group`, as a half-open range.
    pub fn row_group_range(&self, group: usize) -> std::ops::Range<usize> {
        match &self.row_group_starts {
            Some(groups) => groups[group]..groups[group + 1],
            None => group..group + 1,
        }
    }

    /// Whether every row group consists of exactly one row.
    pub fn has_trivial_row_grouping(&self) -> bool {
        match &self.row_group_starts {
            Some(groups) => groups.windows(2).all(|w| w[1] - w[0] == 1),
            None => true,
        }
    }

    /// Replace the row grouping of a ready matrix.
    ///
    /// `starts` must begin at zero, be non-decreasing and end with the row count.
    pub fn set_row_groups(&mut self, starts: Vec<usize>) -> Result<()> {
        if starts.first() != Some(&0)
            || starts.last() != Some(&self.row_count)
            || starts.windows(2).any(|w| w[0] > w[1])
        {
            return Err(PmcError::invalid_argument(
                "row group offsets must start at zero, be non-decreasing and end at the row count",
            ));
        }
        self.row_group_starts = Some(starts);
        Ok(())
    }

    /// Borrowed view of row `row`.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not finalized or `row >= row_count`; use
    /// [`try_rows`](Self::try_rows) for a checked view.
    pub fn row(&self, row: usize) -> Rows<'_, T> {
        self.rows(row, row + 1)
    }

    /// Borrowed view of rows `start..end` as one contiguous entry range.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not finalized or the range exceeds the rows.
    pub fn rows(&self, start: usize, end: usize) -> Rows<'_, T> {
        assert!(self.is_ready(), "row access on an unfinalized matrix");
        let from = self.row_starts[start];
        let to = self.row_starts[end];
        Rows {
            values: &self.values[from..to],
            columns: &self.columns[from..to],
        }
    }

    /// Checked form of [`rows`](Self::rows).
    pub fn try_rows(&self, start: usize, end: usize) -> Result<Rows<'_, T>> {
        self.ensure_ready()?;
        if end > self.row_count {
            return Err(PmcError::RowOutOfRange {
                row: end - 1,
                rows: self.row_count,
            });
        }
        if start > end {
            return Err(PmcError::invalid_argument(format!(
                "row range {start}..{end} is reversed"
            )));
        }
        Ok(self.rows(start, end))
    }

    /// Mutable view of the values of row `row`; the sparsity pattern is fixed.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not finalized or `row >= row_count`.
    pub fn row_mut(&mut self, row: usize) -> RowsMut<'_, T> {
        assert!(self.is_ready(), "row access on an unfinalized matrix");
        let from = self.row_starts[row];
        let to = self.row_starts[row + 1];
        RowsMut {
            values: &mut self.values[from..to],
            columns: &self.columns[from..to],
        }
    }

    /// Iterate over all rows in order. Yields nothing before finalization.
    pub fn iter(&self) -> impl Iterator<Item = Rows<'_, T>> + '_ {
        let rows = if self.is_ready() { self.row_count } else { 0 };
        (0..rows).map(move |row| self.row(row))
    }

    /// Value stored at `(row, column)`, if any.
    ///
    /// Returns `None` before finalization.
    pub fn get_value(&self, row: usize, column: usize) -> Option<&T> {
        if !self.is_ready() || row >= self.row_count {
            return None;
        }
        self.row(row)
            .iter()
            .find(|&(c, _)| c == column)
            .map(|(_, value)| value)
    }

    /// Mutable access to the value stored at `(row, column)`, if any.
    pub fn get_value_mut(&mut self, row: usize, column: usize) -> Option<&mut T> {
        if !self.is_ready() || row >= self.row_count {
            return None;
        }
        let from = self.row_starts[row];
        let to = self.row_starts[row + 1];
        let offset = self.columns[from..to].iter().position(|&c| c == column)?;
        Some(&mut self.values[from + offset])
    }

    /// Approximate heap and inline footprint in bytes.
    pub fn size_in_memory(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of::<T>() * self.values.capacity()
            + std::mem::size_of::<usize>() * self.columns.capacity()
            + std::mem::size_of::<usize>() * self.row_starts.capacity()
            + self
                .row_group_starts
                .as_ref()
                .map_or(0, |g| std::mem::size_of::<usize>() * g.capacity())
    }
}

/// Two matrices are equal when their shape, stored entries and row groups
/// agree, regardless of how they were built.
impl<T: PartialEq> PartialEq for CompressedMatrix<T> {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.row_count == other.row_count
            && self.column_count == other.column_count
            && self.row_starts == other.row_starts
            && self.columns[..self.current_entry_count]
                == other.columns[..other.current_entry_count]
            && self.values[..self.current_entry_count] == other.values[..other.current_entry_count]
            && self.row_group_starts == other.row_group_starts
    }
}

/// Borrowed view of one or more consecutive rows.
#[derive(Debug, Clone, Copy)]
pub struct Rows<'a, T> {
    values: &'a [T],
    columns: &'a [usize],
}

impl<'a, T> Rows<'a, T> {
    /// Number of entries in the view.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the view has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored values.
    pub fn values(&self) -> &'a [T] {
        self.values
    }

    /// Column indices, parallel to [`values`](Self::values).
    pub fn columns(&self) -> &'a [usize] {
        self.columns
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a T)> + 'a {
        self.columns.iter().copied().zip(self.values.iter())
    }
}

/// Mutable view of the values of a row.
#[derive(Debug)]
pub struct RowsMut<'a, T> {
    values: &'a mut [T],
    columns: &'a [usize],
}

impl<T> RowsMut<'_, T> {
    /// Number of entries in the view.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the view has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(column, &mut value)` pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.columns.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T: Value> fmt::Display for CompressedMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_ready() {
            return writeln!(f, "unfinalized {}x{} matrix", self.row_count, self.column_count);
        }
        write!(f, "\t\t")?;
        for column in 0..self.column_count {
            write!(f, "{column}\t")?;
        }
        writeln!(f)?;

        let mut next_group = 0;
        for row in 0..self.row_count {
            if let Some(groups) = &self.row_group_starts {
                while next_group < groups.len() && groups[next_group] == row {
                    if row != 0 {
                        writeln!(f, "\t(\t---- group {next_group} ----\t)")?;
                    }
                    next_group += 1;
                }
            }

            write!(f, "{row}\t(\t")?;
            let mut entries = self.row(row).iter().peekable();
            for column in 0..self.column_count {
                match entries.peek() {
                    Some(&(c, value)) if c == column => {
                        write!(f, "{value}\t")?;
                        entries.next();
                    }
                    _ => write!(f, "0\t")?,
                }
            }
            writeln!(f, "\t)\t{row}")?;
        }

        write!(f, "\t\t")?;
        for column in 0..self.column_count {
            write!(f, "{column}\t")?;
        }
        writeln!(f)
    }
}
