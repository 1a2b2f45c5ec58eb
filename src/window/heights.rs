//! Sparse row-height cache with incremental prefix sums.
//!
//! Rows start at the estimated height; a row reports its real height once it has been laid out.
//! Only the difference between measured and estimated height is stored, in a Fenwick tree, so
//! offsets, totals, and offset-to-row lookups are all `O(log n)` and a new measurement costs
//! `O(log n)` instead of a full re-scan.

use std::collections::HashMap;

/// Read-only view of a vertical row layout.
pub trait RowLayout {
    /// Number of rows
    fn row_count(&self) -> usize;

    /// Accumulated height of all rows strictly before `index` (clamped to the row count)
    fn offset_of(&self, index: usize) -> u64;

    /// Row whose vertical span contains `offset`; the last row when `offset` is past the end.
    /// Undefined (returns 0) when there are no rows.
    fn row_at(&self, offset: u64) -> usize;

    fn total_height(&self) -> u64 {
        self.offset_of(self.row_count())
    }
}

/// Measured heights over an estimated baseline.
#[derive(Debug, Clone)]
pub struct HeightIndex {
    estimated: u32,
    len: usize,
    measured: HashMap<usize, u32>,
    /// 1-based Fenwick tree of `measured - estimated` deltas; `tree.len() == capacity + 1`
    tree: Vec<i64>,
}

const MIN_CAPACITY: usize = 16;

impl HeightIndex {
    /// `estimated` is clamped to at least 1.
    pub fn new(estimated: u32) -> Self {
        Self {
            estimated: estimated.max(1),
            len: 0,
            measured: HashMap::new(),
            tree: vec![0],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn estimated_height(&self) -> u32 {
        self.estimated
    }

    pub fn measured_count(&self) -> usize {
        self.measured.len()
    }

    fn capacity(&self) -> usize {
        self.tree.len() - 1
    }

    /// Grow (or shrink) the row count. New rows use the estimate.
    pub fn set_len(&mut self, len: usize) {
        if len < self.len {
            self.measured.retain(|&index, _| index < len);
            self.len = len;
            self.rebuild(self.capacity());
        } else if len > self.capacity() {
            self.len = len;
            self.rebuild(len.next_power_of_two().max(MIN_CAPACITY));
        } else {
            self.len = len;
        }
    }

    pub fn measured(&self, index: usize) -> Option<u32> {
        self.measured.get(&index).copied()
    }

    pub fn height_of(&self, index: usize) -> u32 {
        self.measured(index).unwrap_or(self.estimated)
    }

    /// Record a measured height, returning the change relative to the previous height.
    ///
    /// Indices at or past the row count are ignored and return 0.
    pub fn set_measured(&mut self, index: usize, height: u32) -> i64 {
        if index >= self.len {
            return 0;
        }
        let previous = self.height_of(index);
        self.measured.insert(index, height);
        let delta = height as i64 - previous as i64;
        if delta != 0 {
            self.add(index, delta);
        }
        delta
    }

    /// Forget every measurement (e.g. after the layout width changed).
    pub fn clear_measurements(&mut self) {
        self.measured.clear();
        self.tree.iter_mut().for_each(|node| *node = 0);
    }

    fn rebuild(&mut self, capacity: usize) {
        self.tree = vec![0; capacity + 1];
        let estimated = self.estimated as i64;
        let deltas: Vec<(usize, i64)> = self
            .measured
            .iter()
            .map(|(&index, &height)| (index, height as i64 - estimated))
            .collect();
        for (index, delta) in deltas {
            if delta != 0 {
                self.add(index, delta);
            }
        }
    }

    fn add(&mut self, index: usize, delta: i64) {
        let capacity = self.capacity();
        let mut node = index + 1;
        while node <= capacity {
            self.tree[node] += delta;
            node += node & node.wrapping_neg();
        }
    }

    fn delta_before(&self, count: usize) -> i64 {
        let mut node = count;
        let mut sum = 0;
        while node > 0 {
            sum += self.tree[node];
            node &= node - 1;
        }
        sum
    }
}

impl RowLayout for HeightIndex {
    fn row_count(&self) -> usize {
        self.len
    }

    fn offset_of(&self, index: usize) -> u64 {
        let count = index.min(self.len);
        let offset = count as i64 * self.estimated as i64 + self.delta_before(count);
        offset.max(0) as u64
    }

    fn row_at(&self, offset: u64) -> usize {
        if self.len == 0 {
            return 0;
        }
        let target = offset.min(i64::MAX as u64) as i64;
        let estimated = self.estimated as i64;

        // Fenwick descent for the largest row count whose prefix height is <= target.
        let mut pos = 0usize;
        let mut acc = 0i64;
        let mut step = self.capacity();
        while step > 0 {
            let next = pos + step;
            if next <= self.len {
                let block = step as i64 * estimated + self.tree[next];
                if acc + block <= target {
                    pos = next;
                    acc += block;
                }
            }
            step >>= 1;
        }
        pos.min(self.len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_offset(index: &HeightIndex, row: usize) -> u64 {
        (0..row.min(index.len()))
            .map(|i| index.height_of(i) as u64)
            .sum()
    }

    #[test]
    fn unmeasured_rows_use_estimate() {
        let mut index = HeightIndex::new(3);
        index.set_len(10);

        assert_eq!(index.total_height(), 30);
        assert_eq!(index.offset_of(4), 12);
        assert_eq!(index.row_at(0), 0);
        assert_eq!(index.row_at(2), 0);
        assert_eq!(index.row_at(3), 1);
        assert_eq!(index.row_at(29), 9);
        assert_eq!(index.row_at(500), 9);
    }

    #[test]
    fn measurements_shift_following_offsets() {
        let mut index = HeightIndex::new(2);
        index.set_len(5);

        assert_eq!(index.set_measured(1, 7), 5);
        assert_eq!(index.offset_of(1), 2);
        assert_eq!(index.offset_of(2), 9);
        assert_eq!(index.total_height(), 15);
        assert_eq!(index.row_at(8), 1);
        assert_eq!(index.row_at(9), 2);

        // Re-measuring reports only the change.
        assert_eq!(index.set_measured(1, 4), -3);
        assert_eq!(index.total_height(), 12);
    }

    #[test]
    fn zero_height_rows_are_skipped_by_lookup() {
        let mut index = HeightIndex::new(1);
        index.set_len(4);
        index.set_measured(1, 0);

        assert_eq!(index.offset_of(2), 1);
        assert_eq!(index.row_at(1), 2);
    }

    #[test]
    fn growth_preserves_measurements() {
        let mut index = HeightIndex::new(1);
        index.set_len(3);
        index.set_measured(2, 5);

        index.set_len(1000);
        assert_eq!(index.measured(2), Some(5));
        assert_eq!(index.total_height(), 1004);
        for row in [0, 2, 3, 17, 999, 1000] {
            assert_eq!(index.offset_of(row), brute_offset(&index, row));
        }
    }

    #[test]
    fn shrink_drops_measurements_past_end() {
        let mut index = HeightIndex::new(1);
        index.set_len(10);
        index.set_measured(8, 4);
        index.set_measured(2, 4);

        index.set_len(5);
        assert_eq!(index.measured(8), None);
        assert_eq!(index.total_height(), 8);
    }

    #[test]
    fn out_of_range_measurement_is_ignored() {
        let mut index = HeightIndex::new(1);
        index.set_len(2);
        assert_eq!(index.set_measured(2, 10), 0);
        assert_eq!(index.total_height(), 2);
    }

    #[test]
    fn clear_restores_estimates() {
        let mut index = HeightIndex::new(2);
        index.set_len(4);
        index.set_measured(0, 9);
        index.clear_measurements();

        assert_eq!(index.measured_count(), 0);
        assert_eq!(index.total_height(), 8);
    }

    #[test]
    fn zero_estimate_is_clamped() {
        let mut index = HeightIndex::new(0);
        index.set_len(3);
        assert_eq!(index.estimated_height(), 1);
        assert_eq!(index.total_height(), 3);
    }

    #[test]
    fn empty_index_has_no_height() {
        let index = HeightIndex::new(4);
        assert_eq!(index.total_height(), 0);
        assert_eq!(index.row_at(10), 0);
    }
}
