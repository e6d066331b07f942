//! Tree grower for gradient boosting.
//!
//! Grows one regression tree from gradients using histogram split search,
//! in-place row partitioning, and the subtraction trick: only the smaller
//! child's histogram is built, the sibling is `parent - smaller`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::binning::BinnedMatrix;
use super::gradients::Gradients;
use super::histogram::{GradStats, NodeHistogram};
use super::partition::RowPartitioner;
use super::split::{GainParams, SplitInfo, find_best_split};
use crate::repr::{MutableTree, NodeId, Tree};
use crate::utils::Parallelism;

// =============================================================================
// GrowthStrategy
// =============================================================================

/// How a tree is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrowthStrategy {
    /// Split every splittable node level by level, down to `max_depth`.
    DepthWise { max_depth: u32 },
    /// Repeatedly split the leaf with the highest gain until there are
    /// `max_leaves` leaves.
    LeafWise { max_leaves: u32 },
}

impl Default for GrowthStrategy {
    fn default() -> Self {
        GrowthStrategy::LeafWise { max_leaves: 20 }
    }
}

/// Parameters for tree growth.
#[derive(Clone, Debug)]
pub struct GrowerParams {
    pub gain: GainParams,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f32,
    pub growth_strategy: GrowthStrategy,
}

impl Default for GrowerParams {
    fn default() -> Self {
        Self {
            gain: GainParams::default(),
            learning_rate: 0.2,
            growth_strategy: GrowthStrategy::default(),
        }
    }
}

// =============================================================================
// TreeGrower
// =============================================================================

/// A node waiting to be split or finalized.
struct Candidate {
    node: NodeId,
    depth: u32,
    stats: GradStats,
    hist: NodeHistogram,
    split: Option<SplitInfo>,
}

/// Tree grower.
///
/// Holds the row partitioner across rounds so its buffers are reused; after
/// [`grow`](Self::grow) it still describes which rows reached which leaf.
pub struct TreeGrower {
    params: GrowerParams,
    partitioner: RowPartitioner,
    parallelism: Parallelism,
}

impl TreeGrower {
    pub fn new(params: GrowerParams, parallelism: Parallelism) -> Self {
        Self {
            params,
            partitioner: RowPartitioner::new(),
            parallelism,
        }
    }

    /// Grow one tree on `rows` (ascending row indices into `binned`).
    pub fn grow(&mut self, binned: &BinnedMatrix, gradients: &Gradients, rows: &[u32]) -> MutableTree {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        self.partitioner.reset(rows);

        let (grad, hess) = gradients.sum(rows);
        let root_stats = GradStats::new(grad, hess, rows.len() as u32);
        let root_hist = NodeHistogram::build(binned, gradients, rows, self.parallelism);
        let root = self.candidate(root, 0, root_stats, root_hist, binned);

        match self.params.growth_strategy {
            GrowthStrategy::DepthWise { .. } => {
                let mut queue = VecDeque::from([root]);
                while let Some(mut c) = queue.pop_front() {
                    match c.split.take() {
                        Some(split) => {
                            let [l, r] = self.apply_split(&mut tree, c, split, binned, gradients);
                            queue.push_back(l);
                            queue.push_back(r);
                        }
                        None => tree.make_leaf(c.node, self.leaf_value(c.stats)),
                    }
                }
            }
            GrowthStrategy::LeafWise { max_leaves } => {
                let mut open = vec![root];
                while open.len() < max_leaves as usize {
                    let Some(idx) = best_candidate(&open) else {
                        break;
                    };
                    let mut c = open.swap_remove(idx);
                    let Some(split) = c.split.take() else {
                        break;
                    };
                    let children = self.apply_split(&mut tree, c, split, binned, gradients);
                    open.extend(children);
                }
                for c in open {
                    tree.make_leaf(c.node, self.leaf_value(c.stats));
                }
            }
        }

        tree
    }

    /// Add each leaf's value to the predictions of the rows that reached it
    /// during the last [`grow`](Self::grow).
    ///
    /// Only valid for rows the tree was grown on.
    pub fn update_predictions(&self, tree: &Tree, predictions: &mut [f32]) {
        for node in 0..tree.n_nodes() as NodeId {
            if !tree.is_leaf(node) {
                continue;
            }
            let value = tree.leaf_value(node);
            for &row in self.partitioner.rows(node) {
                predictions[row as usize] += value;
            }
        }
    }

    fn leaf_value(&self, stats: GradStats) -> f32 {
        self.params.gain.compute_leaf_weight(stats) * self.params.learning_rate
    }

    fn candidate(
        &self,
        node: NodeId,
        depth: u32,
        stats: GradStats,
        hist: NodeHistogram,
        binned: &BinnedMatrix,
    ) -> Candidate {
        let depth_allows = match self.params.growth_strategy {
            GrowthStrategy::DepthWise { max_depth } => depth < max_depth,
            GrowthStrategy::LeafWise { .. } => true,
        };
        let split = if depth_allows && stats.count >= 2 * self.params.gain.min_samples_leaf.max(1) {
            find_best_split(&hist, stats, binned.cuts(), &self.params.gain, self.parallelism)
        } else {
            None
        };
        Candidate {
            node,
            depth,
            stats,
            hist,
            split,
        }
    }

    fn apply_split(
        &mut self,
        tree: &mut MutableTree,
        parent: Candidate,
        split: SplitInfo,
        binned: &BinnedMatrix,
        gradients: &Gradients,
    ) -> [Candidate; 2] {
        let (left, right) = tree.apply_numeric_split(parent.node, split.feature as u32, split.threshold);
        self.partitioner
            .split(parent.node, left, right, binned, split.feature, split.bin);

        let left_is_smaller = split.left.count <= split.right.count;
        let smaller = if left_is_smaller { left } else { right };
        let small_hist =
            NodeHistogram::build(binned, gradients, self.partitioner.rows(smaller), self.parallelism);
        let large_hist = NodeHistogram::subtract(&parent.hist, &small_hist);
        let (left_hist, right_hist) = if left_is_smaller {
            (small_hist, large_hist)
        } else {
            (large_hist, small_hist)
        };

        let depth = parent.depth + 1;
        [
            self.candidate(left, depth, split.left, left_hist, binned),
            self.candidate(right, depth, split.right, right_hist, binned),
        ]
    }
}

/// Open candidate with the highest gain; ties go to the lowest node id.
fn best_candidate(open: &[Candidate]) -> Option<usize> {
    open.iter()
        .enumerate()
        .filter_map(|(i, c)| c.split.as_ref().map(|s| (i, c.node, s.gain)))
        .fold(None, |best: Option<(usize, NodeId, f64)>, cur| match best {
            Some(b) if b.2 > cur.2 || (b.2 == cur.2 && b.1 < cur.1) => Some(b),
            _ => Some(cur),
        })
        .map(|(i, _, _)| i)
}
