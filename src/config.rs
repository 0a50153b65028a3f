//! Loader configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Options controlling how WCON files are loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Follow `files.prev` links and merge earlier chunks.
    #[serde(default = "default_true")]
    pub load_prev_chunks: bool,

    /// Follow `files.next` links and merge later chunks.
    #[serde(default = "default_true")]
    pub load_next_chunks: bool,

    /// Treat a missing `"tracker-commons"` marker as an error instead of a warning.
    #[serde(default)]
    pub require_marker: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            load_prev_chunks: true,
            load_next_chunks: true,
            require_marker: false,
        }
    }
}

impl LoadOptions {
    /// Options that load only the named file, ignoring any chunk links.
    pub fn single_file() -> Self {
        Self {
            load_prev_chunks: false,
            load_next_chunks: false,
            ..Self::default()
        }
    }

    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let options = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(options)
    }
}
