//! Per-key occurrence counting for inspection passes
//!
//! Keys keep first-seen insertion order so reports come out in the same
//! order on every run over the same snapshot.

use fnv::FnvHashMap;

/// Occurrence counts keyed by decoded content or class name
#[derive(Debug, Default, Clone)]
pub struct FrequencyTable {
    /// Key -> position in `entries`
    index: FnvHashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `key`
    pub fn increment(&mut self, key: &str) {
        if let Some(&pos) = self.index.get(key) {
            self.entries[pos].1 += 1;
            return;
        }
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push((key.to_string(), 1));
    }

    /// Count one more occurrence of an owned key, reusing its allocation on first sight
    pub fn increment_owned(&mut self, key: String) {
        if let Some(&pos) = self.index.get(key.as_str()) {
            self.entries[pos].1 += 1;
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, 1));
    }

    /// Current count for `key` (0 if never seen)
    pub fn count(&self, key: &str) -> u64 {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    /// Consume the table, keeping entries whose count reaches `threshold`
    pub fn into_at_or_above(self, threshold: u64) -> Vec<(String, u64)> {
        self.entries
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .collect()
    }
}
