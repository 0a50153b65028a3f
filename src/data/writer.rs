use std::collections::BTreeMap;

use super::error::{Result, WconError};
use super::model::{Attribute, CellValue, SubjectId};
use super::table::CanonicalTable;
use super::value::Value;
use super::worm::WormData;

impl WormData {
    /// Canonical WCON tree for this worm. Loading its serialization yields
    /// the same table.
    pub fn to_value(&self) -> Result<Value> {
        let mut root = BTreeMap::new();
        root.insert("tracker-commons".to_string(), Value::Bool(true));
        root.insert(
            "units".to_string(),
            Value::Object(
                self.units
                    .iter()
                    .map(|(k, u)| (k.clone(), Value::String(u.to_string())))
                    .collect(),
            ),
        );
        if let Some(metadata) = &self.metadata {
            root.insert("metadata".to_string(), metadata.clone());
        }
        if let Some(files) = &self.files {
            root.insert("files".to_string(), files.to_value());
        }

        let mut data = match &self.table {
            Some(table) => table_records(table)?,
            None => Vec::new(),
        };
        data.extend(self.untimed.iter().cloned());
        root.insert("data".to_string(), Value::Array(data));

        for (key, value) in &self.special_root {
            root.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(root))
    }

    /// Pretty-printed canonical WCON text.
    pub fn to_canonical_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }
}

/// One record per subject per row. `x` and `y` share a record unless their
/// aspect counts differ at that row.
fn table_records(table: &CanonicalTable) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    for id in table.ids() {
        let own = table.columns_of(&id);
        for (r, t) in table.rows().iter().enumerate() {
            let mut fields: BTreeMap<Attribute, Vec<CellValue>> = BTreeMap::new();
            for attr in Attribute::ALL {
                let values = row_values(table, r, own.clone(), attr)?;
                if !values.is_empty() {
                    fields.insert(attr, values);
                }
            }
            if fields.is_empty() {
                continue;
            }

            let split_y = match (fields.get(&Attribute::X), fields.get(&Attribute::Y)) {
                (Some(x), Some(y)) => x.len() != y.len(),
                _ => false,
            };
            let y_only = if split_y { fields.remove(&Attribute::Y) } else { None };

            records.push(record(&id, t.get(), fields));
            if let Some(y) = y_only {
                records.push(record(&id, t.get(), BTreeMap::from([(Attribute::Y, y)])));
            }
        }
    }
    Ok(records)
}

/// Present values of `attr` for one subject at row `r`, in aspect order.
fn row_values(
    table: &CanonicalTable,
    r: usize,
    own: std::ops::Range<usize>,
    attr: Attribute,
) -> Result<Vec<CellValue>> {
    let mut values = Vec::new();
    for c in own {
        let column = &table.columns()[c];
        if column.key != attr {
            continue;
        }
        let Some(value) = table.cell(r, c) else {
            continue;
        };
        if column.aspect != values.len() {
            return Err(WconError::invalid(
                column.to_string(),
                format!("aspect gap at t={}", table.rows()[r]),
            ));
        }
        values.push(value.clone());
    }
    Ok(values)
}

fn record(id: &SubjectId, t: f64, fields: BTreeMap<Attribute, Vec<CellValue>>) -> Value {
    let mut out = BTreeMap::new();
    out.insert("id".to_string(), id_value(id));
    out.insert("t".to_string(), Value::Float(t));
    for (attr, values) in fields {
        let value = if attr.is_aspected() {
            Value::Array(values.iter().map(cell_value).collect())
        } else {
            values.first().map_or(Value::Null, cell_value)
        };
        out.insert(attr.key().to_string(), value);
    }
    Value::Object(out)
}

fn id_value(id: &SubjectId) -> Value {
    match id {
        SubjectId::Bool(b) => Value::Bool(*b),
        SubjectId::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Value::Integer(*n as i64),
        SubjectId::Number(n) => Value::Float(*n),
        SubjectId::Text(s) => Value::String(s.clone()),
    }
}

fn cell_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Number(v) => Value::Float(*v),
        CellValue::Label(s) => Value::String(s.clone()),
    }
}
