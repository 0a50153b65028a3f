use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::model::{CellValue, ColumnKey, Time};

/// Errors raised while loading or merging WCON data. Every variant is fatal.
#[derive(Error, Debug)]
pub enum WconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON syntax error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate key {key:?} at {path}")]
    DuplicateKey { key: String, path: String },

    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("\"tracker-commons\" is set to false")]
    MarkerFalse,

    #[error("Length mismatch in {field}: expected {expected}, found {found}")]
    LengthMismatch {
        field: String,
        expected: String,
        found: usize,
    },

    #[error("Aspect mismatch at time index {slot}: {counts}")]
    AspectMismatch { slot: usize, counts: String },

    #[error("Data conflict: {0}")]
    DataConflict(ConflictReport),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Unrecognized data key: {0}")]
    UnrecognizedKey(String),

    #[error("Unknown unit {spec:?} for {key}")]
    UnknownUnit { key: String, spec: String },

    #[error("Chunk link error for {path}: {reason}")]
    ChunkLink { path: PathBuf, reason: String },
}

/// Result type for WCON operations.
pub type Result<T> = std::result::Result<T, WconError>;

impl WconError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        WconError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        WconError::DataConflict(ConflictReport {
            cells: Vec::new(),
            message: Some(message.into()),
        })
    }
}

// ---------------------------------------------------------------------------
// ConflictReport – which cells disagreed
// ---------------------------------------------------------------------------

/// One cell where both sides of a merge hold different present values.
#[derive(Debug, Clone, PartialEq)]
pub struct CellConflict {
    pub t: Time,
    pub column: ColumnKey,
    pub existing: CellValue,
    pub incoming: CellValue,
}

/// Details carried by [`WconError::DataConflict`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    /// Conflicting cells in row-major table order.
    pub cells: Vec<CellConflict>,
    /// Set for non-table clashes (metadata, units, passthrough keys).
    pub message: Option<String>,
}

const SHOWN_CONFLICTS: usize = 5;

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            return write!(f, "{message}");
        }
        write!(f, "{} conflicting cell(s)", self.cells.len())?;
        for c in self.cells.iter().take(SHOWN_CONFLICTS) {
            write!(
                f,
                "; t={} column {}: {} vs {}",
                c.t, c.column, c.existing, c.incoming
            )?;
        }
        if self.cells.len() > SHOWN_CONFLICTS {
            write!(f, "; ...")?;
        }
        Ok(())
    }
}
