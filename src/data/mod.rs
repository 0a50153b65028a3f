/// Data layer: decoding, normalization, the canonical table and its exports.
///
/// Architecture:
/// ```text
///   WCON text
///        │
///        ▼
///   ┌──────────┐
///   │  value    │  decode → Value tree, duplicate keys rejected
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  segment  │  one `data` record → validated Segment
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  builder  │  per-id sub-tables → conflict-aware fold
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  origin   │  ox/oy folded into x/y, then zeroed
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  worm     │  table + units + metadata + passthrough
///   └──────────┘
/// ```
/// `loader` drives the pipeline (and chunk stitching); `writer`, `export`
/// and `filter` work on the result.

pub mod builder;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod origin;
pub mod segment;
pub mod table;
pub mod units;
pub mod value;
pub mod worm;
pub mod writer;
