use std::collections::BTreeSet;

use super::model::{Attribute, SubjectId};
use super::table::CanonicalTable;

// ---------------------------------------------------------------------------
// Selection predicate: which subjects, attributes and times to keep
// ---------------------------------------------------------------------------

/// A view over part of a canonical table.
///
/// An empty `ids` or `keys` set means "no constraint" on that axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSelection {
    pub ids: BTreeSet<SubjectId>,
    pub keys: BTreeSet<Attribute>,
    /// Inclusive time bounds.
    pub time_range: Option<(f64, f64)>,
}

impl TableSelection {
    pub fn is_unconstrained(&self) -> bool {
        self.ids.is_empty() && self.keys.is_empty() && self.time_range.is_none()
    }
}

/// Return the part of `table` passing the selection.
///
/// A row is kept when it lies in the time range and still holds at least
/// one present cell among the kept columns.
pub fn select(table: &CanonicalTable, selection: &TableSelection) -> CanonicalTable {
    if selection.is_unconstrained() {
        return table.clone();
    }

    let col_idx: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| selection.ids.is_empty() || selection.ids.contains(&c.id))
        .filter(|(_, c)| selection.keys.is_empty() || selection.keys.contains(&c.key))
        .map(|(i, _)| i)
        .collect();

    let row_idx: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, t)| match selection.time_range {
            Some((lo, hi)) => t.get() >= lo && t.get() <= hi,
            None => true,
        })
        .filter(|(r, _)| col_idx.iter().any(|&c| table.cell(*r, c).is_some()))
        .map(|(r, _)| r)
        .collect();

    table.project(&row_idx, &col_idx)
}
