use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::LoadOptions;

use super::builder::build_table;
use super::error::{Result, WconError};
use super::segment::normalize_segment;
use super::units::{StandardUnits, UnitResolver};
use super::value::{decode, Value};
use super::worm::{Diagnostic, FilesManifest, Loaded, WormData, BASIC_KEYS};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load WCON text with the default unit resolver and options.
pub fn load_str(text: &str) -> Result<Loaded> {
    load_str_with(text, &StandardUnits, &LoadOptions::default())
}

/// Load WCON text. Chunk options are ignored: text has no file name to
/// resolve neighbours from.
pub fn load_str_with(
    text: &str,
    resolver: &dyn UnitResolver,
    options: &LoadOptions,
) -> Result<Loaded> {
    let mut loaded = load_unnormalized(text, resolver, options)?;
    loaded.worm.normalize_origin();
    Ok(loaded)
}

/// Load WCON from any reader.
pub fn load_reader<R: Read>(mut reader: R) -> Result<Loaded> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    load_str(&text)
}

/// Load a WCON file and, if it carries a `files` manifest, the chunks it
/// links to. All chunks are merged before origin offsets are folded in, so
/// an offset in one chunk applies to positions from another.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Loaded> {
    load_file_with(path, &StandardUnits, options)
}

pub fn load_file_with(
    path: &Path,
    resolver: &dyn UnitResolver,
    options: &LoadOptions,
) -> Result<Loaded> {
    log::info!("Loading file: {}", path.display());
    let first = load_unnormalized(&std::fs::read_to_string(path)?, resolver, options)?;

    let mut visited = BTreeSet::from([path.to_path_buf()]);
    let mut worm = first.worm.clone();
    let mut diagnostics = first.diagnostics.clone();

    let directions = [
        (Direction::Prev, options.load_prev_chunks),
        (Direction::Next, options.load_next_chunks),
    ];
    for (direction, enabled) in directions {
        if !enabled {
            continue;
        }
        let mut current_path = path.to_path_buf();
        let mut current_files = first.worm.files.clone();
        while let Some(next_path) =
            neighbour_path(&current_path, current_files.as_ref(), direction)?
        {
            if !visited.insert(next_path.clone()) {
                return Err(WconError::ChunkLink {
                    path: next_path,
                    reason: "chunk links form a cycle".to_string(),
                });
            }
            log::debug!("Following {direction:?} chunk: {}", next_path.display());
            let text = std::fs::read_to_string(&next_path).map_err(|e| WconError::ChunkLink {
                path: next_path.clone(),
                reason: e.to_string(),
            })?;
            let chunk = load_unnormalized(&text, resolver, options)?;
            worm = worm.merge(&chunk.worm)?;
            diagnostics.extend(chunk.diagnostics);
            current_files = chunk.worm.files;
            current_path = next_path;
        }
    }

    worm.normalize_origin();
    log::info!("Loaded {} file(s) starting at {}", visited.len(), path.display());
    Ok(Loaded { worm, diagnostics })
}

// ---------------------------------------------------------------------------
// Chunk links
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Prev,
    Next,
}

/// Path of the neighbouring chunk, or `None` at the end of the chain.
///
/// e.g. `worm_2.wcon` with `this = "_2"` and `prev = "_1"` gives `worm_1.wcon`.
fn neighbour_path(
    path: &Path,
    files: Option<&FilesManifest>,
    direction: Direction,
) -> Result<Option<PathBuf>> {
    let Some(files) = files else {
        return Ok(None);
    };
    let fragment = match direction {
        Direction::Prev => files.prev.as_deref(),
        Direction::Next => files.next.as_deref(),
    };
    let Some(fragment) = fragment else {
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| WconError::ChunkLink {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;
    let Some(at) = file_name.find(files.this.as_str()) else {
        return Err(WconError::ChunkLink {
            path: path.to_path_buf(),
            reason: format!("cannot find the current fragment {:?} in the file name", files.this),
        });
    };
    let prefix = &file_name[..at];
    let suffix = &file_name[at + files.this.len()..];
    Ok(Some(path.with_file_name(format!("{prefix}{fragment}{suffix}"))))
}

// ---------------------------------------------------------------------------
// WCON document
// ---------------------------------------------------------------------------

/// Parse one WCON document without folding origin offsets.
fn load_unnormalized(
    text: &str,
    resolver: &dyn UnitResolver,
    options: &LoadOptions,
) -> Result<Loaded> {
    let root = match decode(text)? {
        Value::Object(map) => map,
        other => {
            return Err(WconError::invalid(
                "$",
                format!("expected an object, found {}", other.kind()),
            ))
        }
    };

    let mut diagnostics = Vec::new();
    match root.get("tracker-commons") {
        None if options.require_marker => {
            return Err(WconError::MissingRequiredField("tracker-commons"))
        }
        None => {
            log::warn!("{}", Diagnostic::MissingMarker);
            diagnostics.push(Diagnostic::MissingMarker);
        }
        Some(Value::Bool(true)) => {}
        Some(Value::Bool(false)) => return Err(WconError::MarkerFalse),
        Some(other) => {
            return Err(WconError::invalid(
                "tracker-commons",
                format!("expected a boolean, found {}", other.kind()),
            ))
        }
    }

    let units_value = root.get("units").ok_or(WconError::MissingRequiredField("units"))?;
    let units_obj = units_value
        .as_object()
        .ok_or_else(|| {
            WconError::invalid(
                "units",
                format!("expected an object, found {}", units_value.kind()),
            )
        })?;
    let mut units = BTreeMap::new();
    for (key, spec) in units_obj {
        units.insert(key.clone(), resolver.resolve(key, spec)?);
    }

    let data = root.get("data").ok_or(WconError::MissingRequiredField("data"))?;
    let records: Vec<&Value> = match data {
        Value::Object(map) if map.is_empty() => Vec::new(),
        Value::Object(_) => vec![data],
        Value::Array(items) => items.iter().collect(),
        other => {
            return Err(WconError::invalid(
                "data",
                format!("expected an object or array, found {}", other.kind()),
            ))
        }
    };

    let mut segments = Vec::with_capacity(records.len());
    let mut untimed = Vec::new();
    for (i, record) in records.into_iter().enumerate() {
        let obj = record
            .as_object()
            .ok_or_else(|| {
                WconError::invalid(
                    format!("data[{i}]"),
                    format!("expected an object, found {}", record.kind()),
                )
            })?;
        if obj.contains_key("t") {
            segments.push(normalize_segment(obj, i)?);
        } else {
            untimed.push(record.clone());
        }
    }
    let table = build_table(&segments)?;

    let files = root.get("files").map(FilesManifest::from_value).transpose()?;
    let metadata = root.get("metadata").cloned();
    let special_root: BTreeMap<String, Value> = root
        .iter()
        .filter(|(k, _)| !BASIC_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    log::debug!(
        "Parsed {} segment(s), {} untimed record(s), {} unit(s)",
        segments.len(),
        untimed.len(),
        units.len()
    );

    Ok(Loaded {
        worm: WormData {
            table,
            units,
            metadata,
            files,
            untimed,
            special_root,
        },
        diagnostics,
    })
}
