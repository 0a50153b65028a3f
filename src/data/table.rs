use std::collections::{BTreeMap, BTreeSet};

use super::error::{CellConflict, ConflictReport, Result, WconError};
use super::model::{CellValue, ColumnKey, SubjectId, Time};

// ---------------------------------------------------------------------------
// CanonicalTable – sorted row index × sorted column index → optional cell
// ---------------------------------------------------------------------------

/// Sparse time-indexed table of every subject's samples.
///
/// Invariants: `rows` is strictly ascending, `columns` is strictly ascending,
/// `cells.len() == rows.len() * columns.len()` (row-major).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalTable {
    rows: Vec<Time>,
    columns: Vec<ColumnKey>,
    cells: Vec<Option<CellValue>>,
}

impl CanonicalTable {
    /// Build a table from individual cells. Two entries for the same cell
    /// must agree, otherwise the result is a [`WconError::DataConflict`].
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Time, ColumnKey, CellValue)>,
    {
        let mut staged: BTreeMap<(Time, ColumnKey), CellValue> = BTreeMap::new();
        let mut conflicts = Vec::new();
        for (t, column, value) in entries {
            match staged.get(&(t, column.clone())) {
                Some(existing) if *existing != value => conflicts.push(CellConflict {
                    t,
                    column,
                    existing: existing.clone(),
                    incoming: value,
                }),
                Some(_) => {}
                None => {
                    staged.insert((t, column), value);
                }
            }
        }
        if !conflicts.is_empty() {
            return Err(WconError::DataConflict(ConflictReport {
                cells: conflicts,
                message: None,
            }));
        }

        let rows: Vec<Time> = staged
            .keys()
            .map(|(t, _)| *t)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let columns: Vec<ColumnKey> = staged
            .keys()
            .map(|(_, c)| c.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut table = CanonicalTable {
            cells: vec![None; rows.len() * columns.len()],
            rows,
            columns,
        };
        for ((t, column), value) in staged {
            if let (Some(r), Some(c)) = (table.row_index(t), table.column_index(&column)) {
                table.set(r, c, Some(value));
            }
        }
        Ok(table)
    }

    /// Sorted, unique timestamps.
    pub fn rows(&self) -> &[Time] {
        &self.rows
    }

    /// Sorted, unique `(id, key, aspect)` columns.
    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn row_index(&self, t: Time) -> Option<usize> {
        self.rows.binary_search(&t).ok()
    }

    pub fn column_index(&self, column: &ColumnKey) -> Option<usize> {
        self.columns.binary_search(column).ok()
    }

    /// Cell at row `r`, column `c`.
    pub fn cell(&self, r: usize, c: usize) -> Option<&CellValue> {
        self.cells[r * self.columns.len() + c].as_ref()
    }

    pub(crate) fn set(&mut self, r: usize, c: usize, value: Option<CellValue>) {
        let width = self.columns.len();
        self.cells[r * width + c] = value;
    }

    /// Cell at timestamp `t` for `column`; `None` when absent or unknown.
    pub fn get(&self, t: f64, column: &ColumnKey) -> Option<&CellValue> {
        let r = self.row_index(Time::new(t))?;
        let c = self.column_index(column)?;
        self.cell(r, c)
    }

    /// Every distinct subject id, in column order.
    pub fn ids(&self) -> Vec<SubjectId> {
        let mut ids: Vec<SubjectId> = Vec::new();
        for column in &self.columns {
            if ids.last() != Some(&column.id) {
                ids.push(column.id.clone());
            }
        }
        ids
    }

    /// Column indices belonging to `id`; contiguous because columns sort by id first.
    pub fn columns_of(&self, id: &SubjectId) -> std::ops::Range<usize> {
        let start = self.columns.partition_point(|c| c.id < *id);
        let end = self.columns.partition_point(|c| c.id <= *id);
        start..end
    }

    /// Number of present cells.
    pub fn present_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Present cells in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (Time, &ColumnKey, &CellValue)> + '_ {
        let width = self.columns.len();
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.as_ref()
                .map(|value| (self.rows[i / width], &self.columns[i % width], value))
        })
    }

    /// Conflict-aware union of two tables.
    ///
    /// A cell present on both sides must hold the same value; any
    /// disagreement fails the whole merge and no table is produced.
    pub fn merge(&self, other: &CanonicalTable) -> Result<CanonicalTable> {
        let rows: Vec<Time> = self
            .rows
            .iter()
            .chain(other.rows.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let columns: Vec<ColumnKey> = self
            .columns
            .iter()
            .chain(other.columns.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut merged = CanonicalTable {
            cells: vec![None; rows.len() * columns.len()],
            rows,
            columns,
        };

        for (t, column, value) in self.entries() {
            if let (Some(r), Some(c)) = (merged.row_index(t), merged.column_index(column)) {
                merged.set(r, c, Some(value.clone()));
            }
        }

        let mut conflicts = Vec::new();
        for (t, column, value) in other.entries() {
            let (Some(r), Some(c)) = (merged.row_index(t), merged.column_index(column)) else {
                continue;
            };
            match merged.cell(r, c).cloned() {
                Some(existing) if existing != *value => conflicts.push(CellConflict {
                    t,
                    column: column.clone(),
                    existing,
                    incoming: value.clone(),
                }),
                _ => merged.set(r, c, Some(value.clone())),
            }
        }

        if conflicts.is_empty() {
            Ok(merged)
        } else {
            Err(WconError::DataConflict(ConflictReport {
                cells: conflicts,
                message: None,
            }))
        }
    }

    /// Copy of the table limited to the given rows and columns (both sorted
    /// subsets of this table's indices).
    pub(crate) fn project(&self, row_idx: &[usize], col_idx: &[usize]) -> CanonicalTable {
        let mut out = CanonicalTable {
            rows: row_idx.iter().map(|&r| self.rows[r]).collect(),
            columns: col_idx.iter().map(|&c| self.columns[c].clone()).collect(),
            cells: Vec::with_capacity(row_idx.len() * col_idx.len()),
        };
        for &r in row_idx {
            for &c in col_idx {
                out.cells.push(self.cell(r, c).cloned());
            }
        }
        out
    }
}
