use serde::{Deserialize, Serialize};

/// An ordered set of disjoint half-open `[start, end)` ranges.
///
/// Adding a range that touches or overlaps existing ones merges them, so the
/// set always stays sorted and non-overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranges<T> {
    ranges: Vec<(T, T)>,
}

impl<T> Default for Ranges<T> {
    fn default() -> Self {
        Self { ranges: Vec::new() }
    }
}

impl<T: Copy + Ord> Ranges<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `[start, end)`. Empty or inverted ranges are ignored.
    pub fn add(&mut self, start: T, end: T) {
        if start >= end {
            return;
        }

        // First range whose end reaches `start`; everything before it is
        // strictly to the left and untouched.
        let first = self.ranges.partition_point(|&(_, e)| e < start);
        let mut merged = (start, end);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].0 <= merged.1 {
            merged.0 = merged.0.min(self.ranges[last].0);
            merged.1 = merged.1.max(self.ranges[last].1);
            last += 1;
        }
        self.ranges.splice(first..last, std::iter::once(merged));
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn start(&self, i: usize) -> T {
        self.ranges[i].0
    }

    pub fn end(&self, i: usize) -> T {
        self.ranges[i].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (T, T)> + '_ {
        self.ranges.iter().copied()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}
