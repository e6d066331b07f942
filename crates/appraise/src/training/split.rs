//! Split gain and best-split search.

use super::binning::BinCuts;
use super::histogram::{GradStats, NodeHistogram};
use crate::utils::Parallelism;

// =============================================================================
// Gain Parameters
// =============================================================================

/// Parameters for split gain computation and leaf weight calculation.
///
/// Static for the lifetime of training.
#[derive(Clone, Debug)]
pub struct GainParams {
    /// L2 regularization (lambda).
    pub reg_lambda: f32,
    /// Minimum split gain (gamma).
    pub min_gain: f32,
    /// Minimum sum of hessians per child.
    pub min_child_weight: f32,
    /// Minimum samples per child.
    pub min_samples_leaf: u32,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            reg_lambda: 1.0,
            min_gain: 0.0,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
        }
    }
}

impl GainParams {
    /// Split gain:
    ///
    /// ```text
    /// gain = 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G_P²/(H_P + λ)] - γ
    /// ```
    #[inline]
    pub fn compute_gain(&self, left: GradStats, right: GradStats, parent: GradStats) -> f64 {
        let lambda = self.reg_lambda as f64;
        let score = |s: GradStats| s.grad * s.grad / (s.hess + lambda);
        0.5 * (score(left) + score(right) - score(parent)) - self.min_gain as f64
    }

    /// Check if a split satisfies minimum child constraints.
    #[inline]
    pub fn is_valid_split(&self, left: GradStats, right: GradStats) -> bool {
        let min_weight = self.min_child_weight as f64;
        left.hess >= min_weight
            && right.hess >= min_weight
            && left.count >= self.min_samples_leaf
            && right.count >= self.min_samples_leaf
    }

    /// Newton step for a leaf: `-G / (H + λ)`.
    #[inline]
    pub fn compute_leaf_weight(&self, stats: GradStats) -> f32 {
        (-stats.grad / (stats.hess + self.reg_lambda as f64)) as f32
    }
}

// =============================================================================
// SplitInfo
// =============================================================================

/// Best split found for a node.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitInfo {
    pub feature: usize,
    /// Last bin that goes left.
    pub bin: usize,
    /// Raw-value threshold equivalent to `bin`; values `< threshold` go left.
    pub threshold: f32,
    pub gain: f64,
    pub left: GradStats,
    pub right: GradStats,
}

/// Find the best split of a node.
///
/// Features are scanned independently (in parallel when allowed) and
/// combined in feature order; on equal gain the lowest feature index and
/// lowest bin win, so the result does not depend on `parallelism`. Returns
/// `None` if no valid split has positive gain.
pub fn find_best_split(
    hist: &NodeHistogram,
    parent: GradStats,
    cuts: &BinCuts,
    params: &GainParams,
    parallelism: Parallelism,
) -> Option<SplitInfo> {
    let per_feature = parallelism.maybe_par_map(hist.features(), |fh| {
        let feature = fh.feature();
        let bins = fh.bins();
        let mut best: Option<SplitInfo> = None;
        let mut left = GradStats::default();

        // The last bin cannot be a left boundary.
        for bin in 0..bins.len().saturating_sub(1) {
            left = left.merge(bins[bin]);
            let right = parent.sub(left);
            if !params.is_valid_split(left, right) {
                continue;
            }
            let gain = params.compute_gain(left, right, parent);
            if gain > 0.0 && best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(SplitInfo {
                    feature,
                    bin,
                    threshold: cuts.threshold(feature, bin),
                    gain,
                    left,
                    right,
                });
            }
        }
        best
    });

    per_feature
        .into_iter()
        .flatten()
        .fold(None, |best: Option<SplitInfo>, candidate| match best {
            Some(b) if b.gain >= candidate.gain => Some(b),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;
    use crate::training::binning::BinnedMatrix;
    use crate::training::gradients::Gradients;

    #[test]
    fn gain_of_symmetric_split() {
        let params = GainParams::default();
        let gain = params.compute_gain(
            GradStats::new(10.0, 5.0, 5),
            GradStats::new(-10.0, 5.0, 5),
            GradStats::new(0.0, 10.0, 10),
        );
        // 0.5 * (100/6 + 100/6 - 0)
        assert_relative_eq!(gain, 100.0 / 6.0, epsilon = 1e-9);
    }

    #[test]
    fn valid_split_respects_minimums() {
        let params = GainParams {
            min_child_weight: 5.0,
            min_samples_leaf: 10,
            ..Default::default()
        };
        let ok = GradStats::new(0.0, 5.0, 10);
        assert!(params.is_valid_split(ok, ok));
        assert!(!params.is_valid_split(GradStats::new(0.0, 4.0, 10), ok));
        assert!(!params.is_valid_split(GradStats::new(0.0, 5.0, 9), ok));
    }

    #[test]
    fn leaf_weight_is_newton_step() {
        let params = GainParams::default();
        let w = params.compute_leaf_weight(GradStats::new(-10.0, 5.0, 5));
        assert_relative_eq!(w, 10.0 / 6.0, epsilon = 1e-6);
    }

    fn best_split_for(x: ndarray::Array2<f32>, grads: &[f32], parallelism: Parallelism) -> Option<SplitInfo> {
        let binned = BinnedMatrix::from_features(x.view(), 255, Parallelism::Sequential);
        let mut g = Gradients::new(grads.len());
        for (i, &v) in grads.iter().enumerate() {
            g.set(i, v, 1.0);
        }
        let rows: Vec<u32> = (0..grads.len() as u32).collect();
        let hist = NodeHistogram::build(&binned, &g, &rows, parallelism);
        let (sg, sh) = g.sum(&rows);
        let parent = GradStats::new(sg, sh, rows.len() as u32);
        find_best_split(&hist, parent, binned.cuts(), &GainParams::default(), parallelism)
    }

    #[test]
    fn finds_separating_feature() {
        // Feature 1 separates negative and positive gradients; feature 0 is noise.
        let x = array![[1.0f32, 0.0], [0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 1.0]];
        let grads = [-5.0, -5.0, -5.0, 5.0, 5.0, 5.0];

        let split = best_split_for(x, &grads, Parallelism::Sequential).unwrap();
        assert_eq!(split.feature, 1);
        assert_eq!(split.bin, 0);
        assert_relative_eq!(split.threshold, 0.5);
        assert_eq!(split.left.count, 3);
        assert_eq!(split.right.count, 3);
    }

    #[test]
    fn ties_prefer_lowest_feature() {
        // Two identical columns.
        let x = array![[0.0f32, 0.0], [0.0, 0.0], [1.0, 1.0], [1.0, 1.0]];
        let grads = [-1.0, -1.0, 1.0, 1.0];

        for p in [Parallelism::Sequential, Parallelism::Parallel] {
            let split = best_split_for(x.clone(), &grads, p).unwrap();
            assert_eq!(split.feature, 0);
        }
    }

    #[test]
    fn no_split_on_constant_features() {
        let x = array![[1.0f32], [1.0], [1.0]];
        assert!(best_split_for(x, &[1.0, -1.0, 0.0], Parallelism::Sequential).is_none());
    }
}
