// Heap inspections
//
// Every inspection borrows a heap graph, owns an output sink, and runs exactly
// once: `inspect` consumes the inspector, walks every instance, then renders
// the report into the sink. The whole traversal finishes before the first byte
// is written. The sink is dropped when `inspect` returns, whatever the outcome.
//
// Failure model:
// - configuration problems (negative threshold, missing heap or sink) are
//   reported by the builder, before any traversal
// - malformed instances are skipped and logged at trace level
// - only sink I/O aborts a run in progress

mod duplicate_strings;
mod self_references;

pub use duplicate_strings::{count_duplicate_strings, DuplicateStringsInspector};
pub use self_references::{count_self_references, SelfReferencesInspector};

use crate::error::{InspectionError, Result};
use crate::frequency::FrequencyTable;
use crate::report::{Finding, InspectionKind, InspectionReport, ReportFormat};
use std::io::Write;
use std::marker::PhantomData;

#[cfg(test)]
mod tests;

/// Default threshold for the duplicate strings inspection
pub const DEFAULT_DUPLICATE_THRESHOLD: u64 = 100;

/// Default threshold for the self-references inspection
pub const DEFAULT_SELF_REFERENCE_THRESHOLD: u64 = 1;

/// Minimum count a key needs to appear in a report
///
/// Always non-negative: negative values are rejected by [`Threshold::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Threshold(u64);

impl Threshold {
    /// Validate a signed threshold
    pub fn new(value: i64) -> Result<Self> {
        u64::try_from(value).map(Self).map_err(|_| {
            InspectionError::InvalidConfiguration(format!(
                "threshold must be non-negative, got {}",
                value
            ))
        })
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Threshold {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Validated, immutable settings for one inspection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectionConfig {
    pub threshold: Threshold,
    pub format: ReportFormat,
}

impl InspectionConfig {
    pub fn new(threshold: Threshold) -> Self {
        Self {
            threshold,
            format: ReportFormat::Text,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }
}

/// A single-shot heap inspection
pub trait Inspection {
    /// Which report this inspection produces
    fn kind(&self) -> InspectionKind;

    /// Traverse the heap once and write the report to the sink
    ///
    /// Consumes the inspector, so a second pass over the same counts is impossible.
    fn inspect(self) -> Result<InspectionReport>;
}

/// Construction hook used by [`InspectorBuilder`]
pub trait FromConfig<'a, G: ?Sized, W>: Sized {
    const DEFAULT_THRESHOLD: u64;

    fn from_config(heap: &'a G, sink: W, config: InspectionConfig) -> Self;
}

/// Collects an inspector's collaborators and validates them in one place
pub struct InspectorBuilder<'a, G: ?Sized, W, I> {
    heap: Option<&'a G>,
    sink: Option<W>,
    threshold: Option<i64>,
    format: ReportFormat,
    _inspector: PhantomData<fn() -> I>,
}

impl<'a, G: ?Sized, W, I> Default for InspectorBuilder<'a, G, W, I> {
    fn default() -> Self {
        Self {
            heap: None,
            sink: None,
            threshold: None,
            format: ReportFormat::Text,
            _inspector: PhantomData,
        }
    }
}

impl<'a, G: ?Sized, W, I: FromConfig<'a, G, W>> InspectorBuilder<'a, G, W, I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heap(mut self, heap: &'a G) -> Self {
        self.heap = Some(heap);
        self
    }

    pub fn sink(mut self, sink: W) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the inspection's default threshold
    pub fn threshold(mut self, threshold: i64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Validate everything and build the inspector
    pub fn build(self) -> Result<I> {
        let heap = self
            .heap
            .ok_or(InspectionError::MissingCollaborator("heap"))?;
        let sink = self
            .sink
            .ok_or(InspectionError::MissingCollaborator("sink"))?;
        let threshold = match self.threshold {
            Some(value) => Threshold::new(value)?,
            None => Threshold::from(I::DEFAULT_THRESHOLD),
        };
        Ok(I::from_config(
            heap,
            sink,
            InspectionConfig::new(threshold).with_format(self.format),
        ))
    }
}

/// Filter a populated table, render the report, and release the sink
fn finish<W: Write>(
    mut sink: W,
    kind: InspectionKind,
    table: FrequencyTable,
    config: InspectionConfig,
) -> Result<InspectionReport> {
    let findings = table
        .into_at_or_above(config.threshold.get())
        .into_iter()
        .map(|(key, count)| Finding { key, count })
        .collect();
    let report = InspectionReport::new(kind, config.threshold.get(), findings);

    report.write_to(&mut sink, config.format)?;
    sink.flush()?;

    tracing::debug!(
        inspection = ?kind,
        findings = report.findings.len(),
        "inspection report written"
    );
    Ok(report)
}
