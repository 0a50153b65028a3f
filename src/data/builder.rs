use std::collections::BTreeMap;

use super::error::Result;
use super::model::{CellValue, ColumnKey, SubjectId, Time};
use super::segment::Segment;
use super::table::CanonicalTable;

/// Cells of one segment, with columns qualified by `id`.
fn segment_entries<'a>(
    id: &'a SubjectId,
    segment: &'a Segment,
) -> impl Iterator<Item = (Time, ColumnKey, CellValue)> + 'a {
    segment.attributes.iter().flat_map(move |(attr, slots)| {
        slots.iter().enumerate().flat_map(move |(slot, values)| {
            let t = segment.times[slot];
            values.iter().enumerate().map(move |(aspect, value)| {
                (t, ColumnKey::new(id.clone(), *attr, aspect), value.clone())
            })
        })
    })
}

/// Sub-table holding one segment's samples, with columns qualified by `id`.
pub fn segment_table(id: &SubjectId, segment: &Segment) -> Result<CanonicalTable> {
    CanonicalTable::from_entries(segment_entries(id, segment))
}

/// Fold every identified segment into one canonical table.
///
/// All cells go through a single [`CanonicalTable::from_entries`] pass, so
/// the cost grows with the number of cells rather than the number of
/// segments squared. Segments without an `id` are skipped. Returns `None`
/// when nothing contributed a table.
pub fn build_table(segments: &[Segment]) -> Result<Option<CanonicalTable>> {
    let mut by_id: BTreeMap<&SubjectId, Vec<&Segment>> = BTreeMap::new();
    for segment in segments {
        match &segment.id {
            Some(id) => by_id.entry(id).or_default().push(segment),
            None => log::debug!(
                "Segment with {} time point(s) has no id; excluded from the table",
                segment.len()
            ),
        }
    }
    if by_id.is_empty() {
        return Ok(None);
    }

    for (id, group) in &by_id {
        log::debug!("Subject {id}: {} segment(s)", group.len());
    }
    let entries = by_id.iter().flat_map(|(id, group)| {
        group
            .iter()
            .flat_map(move |segment| segment_entries(id, segment))
    });
    let table = CanonicalTable::from_entries(entries)?;
    log::debug!("Built table: {} row(s), {} column(s)", table.num_rows(), table.num_columns());
    Ok(Some(table))
}
