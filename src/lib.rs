//! Canonical loader for WCON worm-tracking files.
//!
//! Loading normalizes any valid WCON input into a [`CanonicalTable`]: one
//! row per timestamp, one column per `(id, key, aspect)`, so two inputs
//! with the same content always load to identical tables.
//!
//! # Example
//!
//! ```no_run
//! use wcon_canon::{load_str, model::{Attribute, ColumnKey}};
//!
//! let loaded = load_str(r#"{"tracker-commons":true,"units":{},
//!     "data":[{"id":1,"t":1.3,"x":[7.2,5],"y":[0.5,0.86]}]}"#).unwrap();
//! let table = loaded.worm.table().unwrap();
//! let x0 = table.get(1.3, &ColumnKey::new(1.into(), Attribute::X, 0));
//! ```

pub mod config;
pub mod data;

pub use config::LoadOptions;
pub use data::error::{ConflictReport, Result, WconError};
pub use data::loader::{load_file, load_file_with, load_reader, load_str, load_str_with};
pub use data::model;
pub use data::table::CanonicalTable;
pub use data::worm::{Diagnostic, Loaded, WormData};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
