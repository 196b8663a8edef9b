// Contract tests shared by every inspection

use super::*;
use crate::graph::{FieldType, FieldValue};
use crate::report::LINE_SEPARATOR;
use crate::snapshot::HeapSnapshot;
use std::cell::Cell;
use std::io;
use std::rc::Rc;

fn duplicates_fallback() -> String {
    format!(
        "{sep}DuplicateStringInspector inspection{sep}No significant amounts of duplicates found{sep}",
        sep = LINE_SEPARATOR
    )
}

fn self_references_fallback() -> String {
    format!(
        "{sep}SelfReferencingObjectsInspector inspection{sep}No significant amounts of self referencing objects found{sep}",
        sep = LINE_SEPARATOR
    )
}

/// Sink that records how many times it was dropped and can fail on demand
struct TrackedSink {
    buf: Vec<u8>,
    drops: Rc<Cell<u32>>,
    fail_writes: bool,
}

impl io::Write for TrackedSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for TrackedSink {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn test_threshold_rejects_negative_values() {
    for value in [-1, -100, i64::MIN] {
        let err = Threshold::new(value).unwrap_err();
        assert!(matches!(err, InspectionError::InvalidConfiguration(_)));
    }
}

#[test]
fn test_threshold_accepts_non_negative_values() {
    for value in [0, 1, 100, i64::MAX] {
        assert_eq!(Threshold::new(value).unwrap().get(), value as u64);
    }
}

#[test]
fn test_constructors_reject_negative_threshold() {
    let snapshot = HeapSnapshot::new();
    assert!(matches!(
        DuplicateStringsInspector::new(&snapshot, Vec::new(), -1),
        Err(InspectionError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        SelfReferencesInspector::new(&snapshot, Vec::new(), -5),
        Err(InspectionError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_builder_requires_heap() {
    let result = DuplicateStringsInspector::<HeapSnapshot, Vec<u8>>::builder()
        .sink(Vec::new())
        .build();
    assert!(matches!(
        result,
        Err(InspectionError::MissingCollaborator("heap"))
    ));
}

#[test]
fn test_builder_requires_sink() {
    let snapshot = HeapSnapshot::new();
    let result = SelfReferencesInspector::<_, Vec<u8>>::builder()
        .heap(&snapshot)
        .build();
    assert!(matches!(
        result,
        Err(InspectionError::MissingCollaborator("sink"))
    ));
}

#[test]
fn test_builder_uses_default_thresholds() {
    let snapshot = HeapSnapshot::new();
    let dup = DuplicateStringsInspector::builder()
        .heap(&snapshot)
        .sink(Vec::new())
        .build()
        .unwrap();
    assert_eq!(dup.config().threshold.get(), DEFAULT_DUPLICATE_THRESHOLD);

    let selfref = SelfReferencesInspector::builder()
        .heap(&snapshot)
        .sink(Vec::new())
        .build()
        .unwrap();
    assert_eq!(selfref.config().threshold.get(), DEFAULT_SELF_REFERENCE_THRESHOLD);
}

#[test]
fn test_builder_rejects_negative_threshold() {
    let snapshot = HeapSnapshot::new();
    let result = DuplicateStringsInspector::builder()
        .heap(&snapshot)
        .sink(Vec::new())
        .threshold(-3)
        .build();
    assert!(matches!(
        result,
        Err(InspectionError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_empty_heap_duplicate_strings() {
    let snapshot = HeapSnapshot::new();
    let mut out = Vec::new();
    DuplicateStringsInspector::with_default_threshold(&snapshot, &mut out)
        .inspect()
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), duplicates_fallback());
}

#[test]
fn test_empty_heap_self_references() {
    let snapshot = HeapSnapshot::new();
    let mut out = Vec::new();
    SelfReferencesInspector::with_default_threshold(&snapshot, &mut out)
        .inspect()
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), self_references_fallback());
}

#[test]
fn test_four_identical_strings_threshold_two() {
    let mut snapshot = HeapSnapshot::new();
    for _ in 0..4 {
        snapshot.add_string_from_chars(&[115, 116, 114, 105, 110, 103]);
    }
    let mut out = Vec::new();
    let report = DuplicateStringsInspector::new(&snapshot, &mut out, 2)
        .unwrap()
        .inspect()
        .unwrap();

    let expected = format!(
        "{sep}DuplicateStringInspector inspection{sep}\"string\" : 4 times{sep}",
        sep = LINE_SEPARATOR
    );
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].count, 4);
}

#[test]
fn test_counts_below_threshold_fall_back() {
    let mut snapshot = HeapSnapshot::new();
    snapshot.add_string("a");
    snapshot.add_string("a");
    let mut out = Vec::new();
    DuplicateStringsInspector::new(&snapshot, &mut out, 3)
        .unwrap()
        .inspect()
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), duplicates_fallback());
}

#[test]
fn test_zero_threshold_reports_every_string() {
    let mut snapshot = HeapSnapshot::new();
    snapshot.add_string("once");
    let mut out = Vec::new();
    let report = DuplicateStringsInspector::new(&snapshot, &mut out, 0)
        .unwrap()
        .inspect()
        .unwrap();
    assert_eq!(report.findings.len(), 1);
}

fn self_referencing_heap(n: usize) -> HeapSnapshot {
    let mut snapshot = HeapSnapshot::new();
    let node = snapshot.add_class("com.example.Node", &[("next", FieldType::Object)]);
    for _ in 0..n {
        let id = snapshot.add_instance(node, &[]);
        snapshot.set_field(id, "com.example.Node", "next", FieldValue::Reference(id));
    }
    snapshot
}

#[test]
fn test_self_references_reported_per_class() {
    let snapshot = self_referencing_heap(3);
    for threshold in 0..=3 {
        let mut out = Vec::new();
        SelfReferencesInspector::new(&snapshot, &mut out, threshold)
            .unwrap()
            .inspect()
            .unwrap();
        let expected = format!(
            "{sep}SelfReferencingObjectsInspector inspection{sep}\"com.example.Node\" class has 3 self references{sep}",
            sep = LINE_SEPARATOR
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }
}

#[test]
fn test_self_references_above_count_fall_back() {
    let snapshot = self_referencing_heap(3);
    let mut out = Vec::new();
    SelfReferencesInspector::new(&snapshot, &mut out, 4)
        .unwrap()
        .inspect()
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), self_references_fallback());
}

#[test]
fn test_identical_inspectors_produce_identical_reports() {
    let mut snapshot = HeapSnapshot::new();
    for word in ["x", "y", "x", "z", "y", "x"] {
        snapshot.add_string(word);
    }
    let run = || {
        let mut out = Vec::new();
        DuplicateStringsInspector::new(&snapshot, &mut out, 1)
            .unwrap()
            .inspect()
            .unwrap();
        out
    };
    let first = run();
    assert_eq!(first, run());

    let text = String::from_utf8(first).unwrap();
    let x = text.find("\"x\"").unwrap();
    let y = text.find("\"y\"").unwrap();
    let z = text.find("\"z\"").unwrap();
    assert!(x < y && y < z, "findings should follow first-seen order");
}

#[test]
fn test_sink_released_once_on_success() {
    let snapshot = HeapSnapshot::new();
    let drops = Rc::new(Cell::new(0));
    let sink = TrackedSink {
        buf: Vec::new(),
        drops: Rc::clone(&drops),
        fail_writes: false,
    };
    DuplicateStringsInspector::with_default_threshold(&snapshot, sink)
        .inspect()
        .unwrap();
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_write_failure_surfaces_io_error_and_releases_sink() {
    let snapshot = self_referencing_heap(1);
    let drops = Rc::new(Cell::new(0));
    let sink = TrackedSink {
        buf: Vec::new(),
        drops: Rc::clone(&drops),
        fail_writes: true,
    };
    let err = SelfReferencesInspector::with_default_threshold(&snapshot, sink)
        .inspect()
        .unwrap_err();
    assert!(matches!(err, InspectionError::Io(_)));
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_json_format_through_builder() {
    let snapshot = self_referencing_heap(2);
    let mut out = Vec::new();
    SelfReferencesInspector::builder()
        .heap(&snapshot)
        .sink(&mut out)
        .format(ReportFormat::Json)
        .build()
        .unwrap()
        .inspect()
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(String::from_utf8(out).unwrap().trim_end()).unwrap();
    assert_eq!(value["findings"][0]["key"], "com.example.Node");
    assert_eq!(value["findings"][0]["count"], 2);
}

#[test]
fn test_inspectors_accept_trait_objects() {
    let snapshot = self_referencing_heap(1);
    let heap: &dyn crate::graph::HeapGraph = &snapshot;
    let mut out = Vec::new();
    let report = SelfReferencesInspector::with_default_threshold(heap, &mut out)
        .inspect()
        .unwrap();
    assert_eq!(report.findings.len(), 1);
}
