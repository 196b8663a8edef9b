//! Self-referencing object detection
//!
//! An instance self-references when a reference field declared directly on
//! its runtime class holds the instance itself. Inherited fields are not
//! examined, so a field declared on `Base` is only ever reported under
//! `Base`, never under each of its subclasses.

use super::{
    finish, FromConfig, Inspection, InspectionConfig, InspectorBuilder, Threshold,
    DEFAULT_SELF_REFERENCE_THRESHOLD,
};
use crate::error::Result;
use crate::frequency::FrequencyTable;
use crate::graph::{FieldValue, HeapGraph};
use crate::report::{InspectionKind, InspectionReport};
use std::io::Write;

/// Finds classes whose instances point at themselves through their own fields
pub struct SelfReferencesInspector<'a, G: ?Sized, W> {
    heap: &'a G,
    sink: W,
    config: InspectionConfig,
}

impl<'a, G: HeapGraph + ?Sized, W: Write> SelfReferencesInspector<'a, G, W> {
    /// Create an inspector, validating `threshold`
    pub fn new(heap: &'a G, sink: W, threshold: i64) -> Result<Self> {
        let threshold = Threshold::new(threshold)?;
        Ok(Self::from_config(heap, sink, InspectionConfig::new(threshold)))
    }

    /// Create an inspector with the default threshold of 1
    pub fn with_default_threshold(heap: &'a G, sink: W) -> Self {
        Self::from_config(
            heap,
            sink,
            InspectionConfig::new(Threshold::from(DEFAULT_SELF_REFERENCE_THRESHOLD)),
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
    for SelfReferencesInspector<'a, G, W>
{
    const DEFAULT_THRESHOLD: u64 = DEFAULT_SELF_REFERENCE_THRESHOLD;

    fn from_config(heap: &'a G, sink: W, config: InspectionConfig) -> Self {
        Self { heap, sink, config }
    }
}

impl<G: HeapGraph + ?Sized, W: Write> Inspection for SelfReferencesInspector<'_, G, W> {
    fn kind(&self) -> InspectionKind {
        InspectionKind::SelfReferences
    }

    fn inspect(self) -> Result<InspectionReport> {
        let kind = self.kind();
        let Self { heap, sink, config } = self;
        let table = count_self_references(heap);
        finish(sink, kind, table, config)
    }
}

/// Count self-referencing fields per declaring class
///
/// Every matching field counts once, so an instance with two fields pointing
/// at itself contributes two.
pub fn count_self_references<G: HeapGraph + ?Sized>(heap: &G) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    let mut visited = 0u64;
    let mut found = 0u64;

    for instance in heap.instances() {
        visited += 1;
        let Some(class) = heap.class_of(instance) else {
            tracing::trace!(%instance, "instance without class, skipping");
            continue;
        };

        let own_reference_fields = class
            .fields
            .iter()
            .filter(|f| f.field_type.is_reference() && f.declaring_class == class.name);

        for field in own_reference_fields {
            match heap.field_value(instance, field) {
                Some(FieldValue::Reference(target)) => {
                    if heap.is_same_instance(instance, target) {
                        found += 1;
                        table.increment(&class.name);
                    }
                }
                Some(_) => {}
                None => {
                    tracing::trace!(%instance, field = %field.name, "declared field has no value");
                }
            }
        }
    }

    tracing::debug!(
        visited,
        found,
        classes = table.len(),
        "self references pass complete"
    );
    table
}
