//! Timestamp-keyed last-write-wins map.
//!
//! Used wherever two raw samples can land on the same key:
//!
//! - stages sleep: primary interval samples are inserted first, the
//!   short wake interruptions second, so a wake sample replaces the stage
//!   sample at the same 30-second boundary;
//! - TCX tracks: points are keyed by their whole second, so the last point
//!   within a second is the one kept.
//!
//! Values come back in ascending key order regardless of insertion order.

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Timeline<K, V> {
    entries: BTreeMap<K, V>,
    overwritten: usize,
}

impl<K: Ord, V> Timeline<K, V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            overwritten: 0,
        }
    }

    /// Insert a value, replacing any earlier value at the same key.
    ///
    /// Returns the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.entries.insert(key, value);
        if previous.is_some() {
            self.overwritten += 1;
        }
        previous
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many inserts replaced an existing value.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    /// Values in ascending key order.
    pub fn into_values(self) -> Vec<V> {
        self.entries.into_values().collect()
    }
}

impl<K: Ord, V> Default for Timeline<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut timeline = Timeline::new();
        assert!(timeline.insert(10, "light").is_none());
        assert_eq!(timeline.insert(10, "wake"), Some("light"));

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.overwritten(), 1);
        assert_eq!(timeline.into_values(), vec!["wake"]);
    }

    #[test]
    fn test_values_sorted_by_key() {
        let mut timeline = Timeline::new();
        timeline.insert(30, 'c');
        timeline.insert(0, 'a');
        timeline.insert(15, 'b');
        assert_eq!(timeline.into_values(), vec!['a', 'b', 'c']);
    }
}
