//! Duplicate strings inspection tests
//!
//! Goal: every string instance is decoded once, equal contents are counted,
//! and the report matches the text format byte for byte.

use heaplens::graph::{FieldType, FieldValue, PrimitiveArray};
use heaplens::inspection::{DuplicateStringsInspector, Inspection};
use heaplens::report::LINE_SEPARATOR;
use heaplens::snapshot::HeapSnapshot;
use std::path::Path;

const HEADER: &str = "DuplicateStringInspector inspection";
const FALLBACK: &str = "No significant amounts of duplicates found";

fn inspect(heap: &HeapSnapshot, threshold: i64) -> String {
    let mut out = Vec::new();
    DuplicateStringsInspector::new(heap, &mut out, threshold)
        .unwrap()
        .inspect()
        .unwrap();
    String::from_utf8(out).unwrap()
}

fn report_lines(text: &str) -> Vec<String> {
    text.split(LINE_SEPARATOR).map(str::to_string).collect()
}

#[test]
fn test_empty_heap_prints_fallback() {
    let heap = HeapSnapshot::new();
    let expected = format!("{LINE_SEPARATOR}{HEADER}{LINE_SEPARATOR}{FALLBACK}{LINE_SEPARATOR}");
    assert_eq!(inspect(&heap, 100), expected);
}

#[test]
fn test_heap_without_strings_prints_fallback() {
    let mut heap = HeapSnapshot::new();
    let class = heap.add_class("not string class", &[("x", FieldType::Int)]);
    for i in 0..3 {
        heap.add_instance(class, &[("x", FieldValue::Int(i))]);
    }
    let expected = format!("{LINE_SEPARATOR}{HEADER}{LINE_SEPARATOR}{FALLBACK}{LINE_SEPARATOR}");
    assert_eq!(inspect(&heap, 0), expected);
}

#[test]
fn test_four_duplicates_with_threshold_two() {
    let mut heap = HeapSnapshot::new();
    for _ in 0..4 {
        heap.add_string_from_chars(&[115, 116, 114, 105, 110, 103]);
    }
    let expected =
        format!("{LINE_SEPARATOR}{HEADER}{LINE_SEPARATOR}\"string\" : 4 times{LINE_SEPARATOR}");
    assert_eq!(inspect(&heap, 2), expected);
}

#[test]
fn test_only_entries_at_or_above_threshold() {
    let mut heap = HeapSnapshot::new();
    for (word, copies) in [("hot", 5), ("warm", 3), ("cold", 1)] {
        for _ in 0..copies {
            heap.add_string(word);
        }
    }
    let lines = report_lines(&inspect(&heap, 3));
    assert_eq!(
        lines,
        vec!["", HEADER, "\"hot\" : 5 times", "\"warm\" : 3 times", ""]
    );
}

#[test]
fn test_report_order_follows_first_occurrence() {
    let mut heap = HeapSnapshot::new();
    for word in ["b", "a", "c", "a", "b", "c", "b"] {
        heap.add_string(word);
    }
    let lines = report_lines(&inspect(&heap, 1));
    assert_eq!(
        &lines[2..5],
        &["\"b\" : 3 times", "\"a\" : 2 times", "\"c\" : 2 times"]
    );
}

#[test]
fn test_different_layouts_with_equal_content_are_merged() {
    let mut heap = HeapSnapshot::new();
    heap.add_string("merge");

    // Compact Latin-1 layout
    let compact = heap.add_class(
        "java.lang.String",
        &[("value", FieldType::Object), ("coder", FieldType::Byte)],
    );
    let bytes = heap.add_array(PrimitiveArray::Byte(
        "merge".bytes().map(|b| b as i8).collect(),
    ));
    heap.add_instance(
        compact,
        &[
            ("value", FieldValue::Reference(bytes)),
            ("coder", FieldValue::Byte(0)),
        ],
    );

    let lines = report_lines(&inspect(&heap, 2));
    assert_eq!(lines[2], "\"merge\" : 2 times");
}

#[test]
fn test_malformed_strings_do_not_abort_the_run() {
    let mut heap = HeapSnapshot::new();
    heap.add_string("fine");
    heap.add_string("fine");
    let broken = heap.add_class("java.lang.String", &[("value", FieldType::Object)]);
    heap.add_instance(broken, &[("value", FieldValue::Null)]);
    heap.add_instance(broken, &[("value", FieldValue::Int(3))]);
    heap.add_instance(broken, &[]);

    let lines = report_lines(&inspect(&heap, 2));
    assert_eq!(lines[2], "\"fine\" : 2 times");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_fixture_snapshot() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mixed_heap.json");
    let heap = HeapSnapshot::load(&path).unwrap();
    let lines = report_lines(&inspect(&heap, 2));
    assert_eq!(lines, vec!["", HEADER, "\"string\" : 4 times", ""]);
}

#[test]
fn test_returned_report_matches_output() {
    let mut heap = HeapSnapshot::new();
    heap.add_string("x");
    heap.add_string("x");
    let mut out = Vec::new();
    let report = DuplicateStringsInspector::new(&heap, &mut out, 1)
        .unwrap()
        .inspect()
        .unwrap();
    assert_eq!(report.threshold, 1);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].key, "x");
    assert_eq!(report.findings[0].count, 2);
}
