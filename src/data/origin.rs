use super::model::{canonical_f64, Attribute, CellValue, ColumnKey};
use super::table::CanonicalTable;

const OFFSETS: [(Attribute, Attribute); 2] = [
    (Attribute::Ox, Attribute::X),
    (Attribute::Oy, Attribute::Y),
];

/// Fold the `ox`/`oy` offsets of every subject into its `x`/`y` columns, then
/// zero the offsets.
///
/// An absent offset counts as zero. Afterwards every row of the offset column
/// holds `0`, marking the subject as normalized. Must run once, after all
/// merges.
pub fn normalize_origin(table: &mut CanonicalTable) {
    for id in table.ids() {
        let own = table.columns_of(&id);
        for (offset, coord) in OFFSETS {
            let Some(oc) = table.column_index(&ColumnKey::new(id.clone(), offset, 0)) else {
                continue;
            };
            let coord_cols: Vec<usize> = own
                .clone()
                .filter(|&c| table.columns()[c].key == coord)
                .collect();

            for r in 0..table.num_rows() {
                if let Some(shift) = table.cell(r, oc).and_then(CellValue::as_f64) {
                    for &c in &coord_cols {
                        if let Some(v) = table.cell(r, c).and_then(CellValue::as_f64) {
                            let shifted = canonical_f64(v + shift);
                            table.set(r, c, Some(CellValue::Number(shifted)));
                        }
                    }
                }
                table.set(r, oc, Some(CellValue::Number(0.0)));
            }
            log::debug!("Folded {offset} into {coord} for subject {id}");
        }
    }
}
