use std::collections::BTreeMap;
use std::fmt;

use super::error::{Result, WconError};
use super::origin::normalize_origin;
use super::table::CanonicalTable;
use super::units::MeasurementUnit;
use super::value::Value;

/// Top-level keys with a meaning of their own. Everything else is kept as
/// an opaque passthrough payload.
pub const BASIC_KEYS: [&str; 5] = ["tracker-commons", "files", "units", "metadata", "data"];

// ---------------------------------------------------------------------------
// FilesManifest – chunk links
// ---------------------------------------------------------------------------

/// The `files` object linking a chunk to its neighbours.
///
/// `this`, `prev` and `next` are fragments of the file name: replacing
/// `this` by `prev` in the current name gives the previous chunk's name.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesManifest {
    pub this: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl FilesManifest {
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| {
                WconError::invalid(
                    "files",
                    format!("expected an object, found {}", value.kind()),
                )
            })?;
        let this = obj
            .get("this")
            .and_then(Value::as_str)
            .ok_or_else(|| WconError::invalid("files.this", "expected a string"))?
            .to_string();
        Ok(FilesManifest {
            this,
            prev: link(obj.get("prev"), "files.prev")?,
            next: link(obj.get("next"), "files.next")?,
        })
    }

    pub fn to_value(&self) -> Value {
        let link = |l: &Option<String>| match l {
            Some(s) => Value::Array(vec![Value::String(s.clone())]),
            None => Value::Null,
        };
        Value::Object(BTreeMap::from([
            ("next".to_string(), link(&self.next)),
            ("prev".to_string(), link(&self.prev)),
            ("this".to_string(), Value::String(self.this.clone())),
        ]))
    }
}

/// `null`, a fragment, or a list of fragments of which the nearest comes first.
fn link(value: Option<&Value>, field: &str) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Array(items)) => match items.first() {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(WconError::invalid(
                field,
                format!("expected a string, found {}", other.kind()),
            )),
        },
        Some(other) => Err(WconError::invalid(
            field,
            format!("expected a string or list, found {}", other.kind()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Non-fatal findings reported alongside a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `"tracker-commons"` was absent; the input was still read as WCON.
    MissingMarker,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingMarker => write!(
                f,
                "{{\"tracker-commons\":true}} was not present; proceeding under the assumption this is a WCON file"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// WormData – the load result
// ---------------------------------------------------------------------------

/// Everything one WCON load (or a merge of loads) produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WormData {
    pub(crate) table: Option<CanonicalTable>,
    pub(crate) units: BTreeMap<String, MeasurementUnit>,
    pub(crate) metadata: Option<Value>,
    pub(crate) files: Option<FilesManifest>,
    pub(crate) untimed: Vec<Value>,
    pub(crate) special_root: BTreeMap<String, Value>,
}

impl WormData {
    /// The canonical table; `None` when `data` held no identified samples.
    pub fn table(&self) -> Option<&CanonicalTable> {
        self.table.as_ref()
    }

    pub fn units(&self) -> &BTreeMap<String, MeasurementUnit> {
        &self.units
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    pub fn files(&self) -> Option<&FilesManifest> {
        self.files.as_ref()
    }

    /// `data` records without a time axis, kept verbatim.
    pub fn untimed_records(&self) -> &[Value] {
        &self.untimed
    }

    /// Top-level keys outside [`BASIC_KEYS`], kept verbatim.
    pub fn special_root(&self) -> &BTreeMap<String, Value> {
        &self.special_root
    }

    pub(crate) fn normalize_origin(&mut self) {
        if let Some(table) = self.table.as_mut() {
            normalize_origin(table);
        }
    }

    /// Combine two loads, failing on any clash.
    ///
    /// Tables merge cell by cell with the conflict rule; units, metadata and
    /// passthrough keys must be absent on one side or equal on both.
    pub fn merge(&self, other: &WormData) -> Result<WormData> {
        let table = match (&self.table, &other.table) {
            (Some(a), Some(b)) => Some(a.merge(b)?),
            (a, b) => a.clone().or_else(|| b.clone()),
        };

        let mut units = self.units.clone();
        for (key, unit) in &other.units {
            match units.get(key) {
                Some(existing) if existing != unit => {
                    return Err(WconError::conflict(format!(
                        "unit for {key:?} differs: {existing} vs {unit}"
                    )));
                }
                Some(_) => {}
                None => {
                    units.insert(key.clone(), unit.clone());
                }
            }
        }

        let metadata = match (&self.metadata, &other.metadata) {
            (Some(a), Some(b)) if a != b => {
                return Err(WconError::conflict("metadata differs between the merged files"));
            }
            (a, b) => a.clone().or_else(|| b.clone()),
        };

        let mut special_root = self.special_root.clone();
        for (key, value) in &other.special_root {
            match special_root.get(key) {
                Some(existing) if existing != value => {
                    return Err(WconError::conflict(format!(
                        "top-level key {key:?} differs between the merged files"
                    )));
                }
                Some(_) => {}
                None => {
                    special_root.insert(key.clone(), value.clone());
                }
            }
        }

        let mut untimed = self.untimed.clone();
        for record in &other.untimed {
            if !untimed.contains(record) {
                untimed.push(record.clone());
            }
        }

        Ok(WormData {
            table,
            units,
            metadata,
            files: self.files.clone().or_else(|| other.files.clone()),
            untimed,
            special_root,
        })
    }
}

/// A successful load and its non-fatal diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub worm: WormData,
    pub diagnostics: Vec<Diagnostic>,
}
