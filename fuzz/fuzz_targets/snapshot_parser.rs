#![no_main]

use heaplens::inspection::{count_duplicate_strings, count_self_references};
use heaplens::snapshot::HeapSnapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary documents must be rejected or inspected, never panic
    if let Ok(heap) = HeapSnapshot::from_json_slice(data) {
        let _ = count_duplicate_strings(&heap);
        let _ = count_self_references(&heap);
    }
});
