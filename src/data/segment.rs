use std::collections::BTreeMap;

use super::error::{Result, WconError};
use super::model::{canonical_f64, Attribute, CellValue, SubjectId, Time};
use super::value::Value;

/// One validated time-window record.
///
/// Every attribute holds exactly `times.len()` slots. Aspected attributes
/// hold `aspect_counts[i]` values at slot `i`; unaspected ones hold one.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: Option<SubjectId>,
    pub times: Vec<Time>,
    pub aspect_counts: Vec<usize>,
    pub attributes: BTreeMap<Attribute, Vec<Vec<CellValue>>>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Validate one decoded `data` record and reshape it into a [`Segment`].
///
/// `index` is the position of the record in `data`, used in error messages.
pub fn normalize_segment(record: &BTreeMap<String, Value>, index: usize) -> Result<Segment> {
    let field = |name: &str| format!("data[{index}].{name}");

    let t = record
        .get("t")
        .ok_or(WconError::MissingRequiredField("t"))?;
    let scalar_t = t.is_scalar();
    let times: Vec<Time> = match t {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(j, v)| number(v, &format!("{}[{j}]", field("t"))).map(Time::new))
            .collect::<Result<_>>()?,
        other => vec![Time::new(number(other, &field("t"))?)],
    };
    if times.is_empty() {
        return Err(WconError::invalid(field("t"), "time axis is empty"));
    }
    let n = times.len();

    let id = record
        .get("id")
        .map(|v| subject_id(v, &field("id")))
        .transpose()?;

    let mut attributes = BTreeMap::new();
    for (key, value) in record {
        if key == "t" || key == "id" {
            continue;
        }
        let attr = Attribute::from_key(key)
            .ok_or_else(|| WconError::UnrecognizedKey(field(key.as_str())))?;
        let slots = if attr.is_aspected() {
            aspected_slots(attr, value, scalar_t, n, &field(key.as_str()))?
        } else {
            unaspected_slots(attr, value, n, &field(key.as_str()))?
        };
        attributes.insert(attr, slots);
    }

    let aspect_counts = common_aspect_counts(&attributes, n)?;

    Ok(Segment {
        id,
        times,
        aspect_counts,
        attributes,
    })
}

/// `x`/`y`: with a scalar `t` the value is the aspect list of the single
/// slot; otherwise a list of per-slot aspect lists.
fn aspected_slots(
    attr: Attribute,
    value: &Value,
    scalar_t: bool,
    n: usize,
    field: &str,
) -> Result<Vec<Vec<CellValue>>> {
    if scalar_t {
        return Ok(vec![aspect_list(attr, value, field)?]);
    }
    let slots = value
        .as_array()
        .ok_or_else(|| {
            WconError::invalid(field, format!("expected an array, found {}", value.kind()))
        })?;
    if slots.len() != n {
        return Err(WconError::LengthMismatch {
            field: field.to_string(),
            expected: n.to_string(),
            found: slots.len(),
        });
    }
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| aspect_list(attr, slot, &format!("{field}[{i}]")))
        .collect()
}

fn aspect_list(attr: Attribute, value: &Value, field: &str) -> Result<Vec<CellValue>> {
    let items = value
        .as_array()
        .ok_or_else(|| {
            WconError::invalid(field, format!("expected an array, found {}", value.kind()))
        })?;
    items
        .iter()
        .enumerate()
        .map(|(j, v)| cell(attr, v, &format!("{field}[{j}]")))
        .collect()
}

/// `ox`/`oy`/`head`/`ventral`: a scalar broadcast over the segment, or a
/// list of length 1 (broadcast) or `n`.
fn unaspected_slots(
    attr: Attribute,
    value: &Value,
    n: usize,
    field: &str,
) -> Result<Vec<Vec<CellValue>>> {
    let values: Vec<CellValue> = match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(j, v)| cell(attr, v, &format!("{field}[{j}]")))
            .collect::<Result<_>>()?,
        scalar => vec![cell(attr, scalar, field)?],
    };
    match values.len() {
        1 => Ok(vec![values; n]),
        len if len == n => Ok(values.into_iter().map(|v| vec![v]).collect()),
        len => Err(WconError::LengthMismatch {
            field: field.to_string(),
            expected: if n == 1 { "1".to_string() } else { format!("1 or {n}") },
            found: len,
        }),
    }
}

/// Per-slot aspect count shared by all aspected attributes (0 if none).
fn common_aspect_counts(
    attributes: &BTreeMap<Attribute, Vec<Vec<CellValue>>>,
    n: usize,
) -> Result<Vec<usize>> {
    let mut counts = Vec::with_capacity(n);
    for slot in 0..n {
        let per_attr: Vec<(Attribute, usize)> = attributes
            .iter()
            .filter(|(attr, _)| attr.is_aspected())
            .map(|(attr, slots)| (*attr, slots[slot].len()))
            .collect();
        let first = per_attr.first().map_or(0, |(_, c)| *c);
        if per_attr.iter().any(|(_, c)| *c != first) {
            let counts = per_attr
                .iter()
                .map(|(attr, c)| format!("{attr} has {c}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(WconError::AspectMismatch { slot, counts });
        }
        counts.push(first);
    }
    Ok(counts)
}

fn cell(attr: Attribute, value: &Value, field: &str) -> Result<CellValue> {
    match value {
        Value::String(s) if !attr.is_numeric() => Ok(CellValue::Label(s.clone())),
        other => number(other, field).map(CellValue::Number),
    }
}

fn number(value: &Value, field: &str) -> Result<f64> {
    value
        .as_f64()
        .map(canonical_f64)
        .ok_or_else(|| {
            WconError::invalid(field, format!("expected a number, found {}", value.kind()))
        })
}

fn subject_id(value: &Value, field: &str) -> Result<SubjectId> {
    match value {
        Value::Bool(b) => Ok(SubjectId::Bool(*b)),
        Value::Integer(_) | Value::Float(_) => Ok(SubjectId::Number(number(value, field)?)),
        Value::String(s) => Ok(SubjectId::Text(s.clone())),
        other => Err(WconError::invalid(
            field,
            format!("id must be a scalar, found {}", other.kind()),
        )),
    }
}
