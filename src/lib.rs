//! heaplens - heap snapshot inspector
//!
//! This library walks a heap snapshot once per inspection and reports two
//! memory anti-patterns: string content duplicated across many instances, and
//! objects whose own fields reference themselves.
//!
//! # Example
//!
//! ```
//! use heaplens::inspection::{DuplicateStringsInspector, Inspection};
//! use heaplens::snapshot::HeapSnapshot;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut heap = HeapSnapshot::new();
//! for _ in 0..4 {
//!     heap.add_string("string");
//! }
//!
//! let mut out = Vec::new();
//! DuplicateStringsInspector::new(&heap, &mut out, 2)?.inspect()?;
//! assert!(String::from_utf8(out)?.contains("\"string\" : 4 times"));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod frequency;
pub mod graph;
pub mod inspection;
pub mod report;
pub mod snapshot;
