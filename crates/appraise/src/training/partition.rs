//! Row partitioning for tree training.
//!
//! A single contiguous buffer of row indices; every tree node owns a range of
//! it. Splitting a node partitions its range stably in place, so each child's
//! rows stay in ascending order.

use super::binning::BinnedMatrix;
use crate::repr::NodeId;

/// Row indices per tree node.
///
/// ```text
/// root owns all rows:      indices: [0, 1, 2, 3, 4, 5]
/// after a split of node 0: indices: [0, 2, 5, 1, 3, 4]
///                                    |-left-| |-right-|
/// ```
#[derive(Debug, Default)]
pub struct RowPartitioner {
    indices: Vec<u32>,
    /// `(begin, end)` into `indices`, indexed by node id.
    ranges: Vec<(usize, usize)>,
    scratch: Vec<u32>,
}

impl RowPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new tree whose root owns `rows`.
    pub fn reset(&mut self, rows: &[u32]) {
        self.indices.clear();
        self.indices.extend_from_slice(rows);
        self.ranges.clear();
        self.ranges.push((0, rows.len()));
    }

    /// Rows owned by `node`.
    #[inline]
    pub fn rows(&self, node: NodeId) -> &[u32] {
        let (begin, end) = self.ranges[node as usize];
        &self.indices[begin..end]
    }

    /// Partition the rows of `node` into `left` (bin `<= split_bin`) and `right`.
    ///
    /// `left` and `right` must be the two ids allocated next, in that order.
    pub fn split(
        &mut self,
        node: NodeId,
        left: NodeId,
        right: NodeId,
        binned: &BinnedMatrix,
        feature: usize,
        split_bin: usize,
    ) {
        debug_assert_eq!(left as usize, self.ranges.len());
        debug_assert_eq!(right, left + 1);

        let (begin, end) = self.ranges[node as usize];
        let bins = binned.feature_bins(feature);

        self.scratch.clear();
        let mut write = begin;
        for i in begin..end {
            let row = self.indices[i];
            if bins[row as usize] as usize <= split_bin {
                self.indices[write] = row;
                write += 1;
            } else {
                self.scratch.push(row);
            }
        }
        self.indices[write..end].copy_from_slice(&self.scratch);

        self.ranges.push((begin, write));
        self.ranges.push((write, end));
    }
}
