//! Duplicate string detection
//!
//! Counts how many string instances decode to the same content. Strings whose
//! content appears at least `threshold` times are reported as
//! `"<content>" : <count> times`.

use super::{
    finish, FromConfig, Inspection, InspectionConfig, InspectorBuilder, Threshold,
    DEFAULT_DUPLICATE_THRESHOLD,
};
use crate::decode::{classify, Decoded};
use crate::error::Result;
use crate::frequency::FrequencyTable;
use crate::graph::HeapGraph;
use crate::report::{InspectionKind, InspectionReport};
use std::io::Write;

/// Finds string content duplicated across many instances
pub struct DuplicateStringsInspector<'a, G: ?Sized, W> {
    heap: &'a G,
    sink: W,
    config: InspectionConfig,
}

impl<'a, G: HeapGraph + ?Sized, W: Write> DuplicateStringsInspector<'a, G, W> {
    /// Create an inspector, validating `threshold`
    pub fn new(heap: &'a G, sink: W, threshold: i64) -> Result<Self> {
        let threshold = Threshold::new(threshold)?;
        Ok(Self::from_config(heap, sink, InspectionConfig::new(threshold)))
    }

    /// Create an inspector with the default threshold of 100
    pub fn with_default_threshold(heap: &'a G, sink: W) -> Self {
        Self::from_config(
            heap,
            sink,
            InspectionConfig::new(Threshold::from(DEFAULT_DUPLICATE_THRESHOLD)),
        )
    }

    pub fn builder() -> InspectorBuilder<'a, G, W, Self> {
        InspectorBuilder::new()
    }

    pub fn config(&self) -> InspectionConfig {
        self.config
    }
}

impl<'a, G: HeapGraph + ?Sized, W: Write> FromConfig<'a, G, W>
    for DuplicateStringsInspector<'a, G, W>
{
    const DEFAULT_THRESHOLD: u64 = DEFAULT_DUPLICATE_THRESHOLD;

    fn from_config(heap: &'a G, sink: W, config: InspectionConfig) -> Self {
        Self { heap, sink, config }
    }
}

impl<G: HeapGraph + ?Sized, W: Write> Inspection for DuplicateStringsInspector<'_, G, W> {
    fn kind(&self) -> InspectionKind {
        InspectionKind::DuplicateStrings
    }

    fn inspect(self) -> Result<InspectionReport> {
        let kind = self.kind();
        let Self { heap, sink, config } = self;
        let table = count_duplicate_strings(heap);
        finish(sink, kind, table, config)
    }
}

/// Count decoded string content across every instance of the heap
pub fn count_duplicate_strings<G: HeapGraph + ?Sized>(heap: &G) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    let mut visited = 0u64;
    let mut strings = 0u64;
    let mut skipped = 0u64;

    for instance in heap.instances() {
        visited += 1;
        let Some(class) = heap.class_of(instance) else {
            tracing::trace!(%instance, "instance without class, skipping");
            skipped += 1;
            continue;
        };
        let Some(shape) = classify(&class.name) else {
            continue;
        };
        match shape.decode(heap, instance, class) {
            Decoded::Text(content) => {
                strings += 1;
                table.increment_owned(content);
            }
            Decoded::NotDecodable => {
                tracing::trace!(%instance, class = %class.name, "undecodable string, skipping");
                skipped += 1;
            }
        }
    }

    tracing::debug!(
        visited,
        strings,
        skipped,
        distinct = table.len(),
        "duplicate strings pass complete"
    );
    table
}
