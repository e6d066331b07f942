//! Quantile binning of the training matrix.
//!
//! Each feature gets a sorted list of cut points. A value's bin is the number
//! of cuts `<= value`, so splitting after bin `b` sends exactly the values
//! `v < cuts[b]` to the left child. The same comparison is used by
//! [`Tree::traverse_to_leaf`](crate::repr::Tree::traverse_to_leaf), which keeps
//! training partitions and raw-feature prediction consistent.

use ndarray::{ArrayView2, Axis};

use crate::utils::Parallelism;

/// Largest supported number of bins per feature (bin indices are `u8`).
pub const MAX_BINS: usize = 256;

// ============================================================================
// BinCuts
// ============================================================================

/// Bin boundaries for all features.
///
/// Stored in a CSR-like layout:
/// - `cut_values`: all cut values concatenated
/// - `cut_ptrs`: offsets into `cut_values`, one more than the feature count
#[derive(Debug, Clone, PartialEq)]
pub struct BinCuts {
    cut_values: Vec<f32>,
    cut_ptrs: Vec<usize>,
}

impl BinCuts {
    /// Compute cuts for a row-major `(n_rows, n_features)` matrix.
    ///
    /// A feature with at most `max_bins` distinct values gets one bin per
    /// value, with cuts at the midpoints. Otherwise cuts are placed so bins
    /// hold roughly equal row counts.
    pub fn compute(features: ArrayView2<f32>, max_bins: usize, parallelism: Parallelism) -> Self {
        debug_assert!((2..=MAX_BINS).contains(&max_bins));

        let per_feature = parallelism.maybe_par_map(0..features.ncols(), |f| {
            let mut column: Vec<f32> = features
                .index_axis(Axis(1), f)
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .collect();
            column.sort_unstable_by(f32::total_cmp);
            feature_cuts(&column, max_bins)
        });

        let mut cut_values = Vec::new();
        let mut cut_ptrs = Vec::with_capacity(per_feature.len() + 1);
        cut_ptrs.push(0);
        for cuts in per_feature {
            cut_values.extend(cuts);
            cut_ptrs.push(cut_values.len());
        }
        Self { cut_values, cut_ptrs }
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.cut_ptrs.len() - 1
    }

    /// Cut points of one feature, ascending.
    #[inline]
    pub fn feature_cuts(&self, feature: usize) -> &[f32] {
        &self.cut_values[self.cut_ptrs[feature]..self.cut_ptrs[feature + 1]]
    }

    /// Number of bins of one feature (`cuts + 1`).
    #[inline]
    pub fn n_bins(&self, feature: usize) -> usize {
        self.feature_cuts(feature).len() + 1
    }

    /// Bin of `value` for `feature`.
    #[inline]
    pub fn bin(&self, feature: usize, value: f32) -> u8 {
        self.feature_cuts(feature).partition_point(|&c| c <= value) as u8
    }

    /// Threshold equivalent to "bin <= `bin`" on raw values.
    #[inline]
    pub fn threshold(&self, feature: usize, bin: usize) -> f32 {
        self.feature_cuts(feature)[bin]
    }
}

/// Cuts for one sorted, finite column.
fn feature_cuts(sorted: &[f32], max_bins: usize) -> Vec<f32> {
    // Distinct values with their counts.
    let mut distinct: Vec<(f32, usize)> = Vec::new();
    for &v in sorted {
        match distinct.last_mut() {
            Some((last, count)) if *last == v => *count += 1,
            _ => distinct.push((v, 1)),
        }
    }
    if distinct.len() < 2 {
        return Vec::new();
    }

    if distinct.len() <= max_bins {
        return distinct
            .windows(2)
            .map(|w| midpoint(w[0].0, w[1].0))
            .collect();
    }

    let n = sorted.len() as f64;
    let per_bin = n / max_bins as f64;
    let mut cuts = Vec::with_capacity(max_bins - 1);
    let mut seen = 0usize;
    for w in distinct.windows(2) {
        seen += w[0].1;
        if seen as f64 >= per_bin * (cuts.len() + 1) as f64 {
            cuts.push(midpoint(w[0].0, w[1].0));
            if cuts.len() == max_bins - 1 {
                break;
            }
        }
    }
    cuts
}

/// A cut strictly above `lo` and at most `hi`.
#[inline]
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = ((lo as f64 + hi as f64) / 2.0) as f32;
    if mid > lo { mid } else { hi }
}

// ============================================================================
// BinnedMatrix
// ============================================================================

/// Column-major bin indices for the training rows.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    bins: Vec<u8>,
    n_rows: usize,
    cuts: BinCuts,
}

impl BinnedMatrix {
    /// Bin a row-major `(n_rows, n_features)` matrix.
    pub fn from_features(
        features: ArrayView2<f32>,
        max_bins: usize,
        parallelism: Parallelism,
    ) -> Self {
        let cuts = BinCuts::compute(features, max_bins, parallelism);
        let n_rows = features.nrows();

        let columns = parallelism.maybe_par_map(0..features.ncols(), |f| {
            features
                .index_axis(Axis(1), f)
                .iter()
                .map(|&v| cuts.bin(f, v))
                .collect::<Vec<u8>>()
        });
        let bins = columns.concat();

        Self { bins, n_rows, cuts }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.cuts.n_features()
    }

    #[inline]
    pub fn cuts(&self) -> &BinCuts {
        &self.cuts
    }

    /// Bins of every row for one feature.
    #[inline]
    pub fn feature_bins(&self, feature: usize) -> &[u8] {
        &self.bins[feature * self.n_rows..(feature + 1) * self.n_rows]
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    #[test]
    fn few_distinct_values_get_midpoint_cuts() {
        let x = array![[1.0f32], [3.0], [3.0], [5.0]];
        let cuts = BinCuts::compute(x.view(), 255, Parallelism::Sequential);

        assert_eq!(cuts.feature_cuts(0), &[2.0, 4.0]);
        assert_eq!(cuts.bin(0, 1.0), 0);
        assert_eq!(cuts.bin(0, 3.0), 1);
        assert_eq!(cuts.bin(0, 4.0), 2);
        assert_eq!(cuts.bin(0, 100.0), 2);
    }

    #[test]
    fn constant_feature_has_one_bin() {
        let x = array![[7.0f32, 1.0], [7.0, 2.0]];
        let cuts = BinCuts::compute(x.view(), 255, Parallelism::Sequential);
        assert_eq!(cuts.n_bins(0), 1);
        assert_eq!(cuts.n_bins(1), 2);
    }

    #[test]
    fn many_distinct_values_respect_max_bins() {
        let x = Array2::from_shape_fn((1000, 1), |(i, _)| i as f32);
        let cuts = BinCuts::compute(x.view(), 16, Parallelism::Sequential);

        assert_eq!(cuts.n_bins(0), 16);
        let c = cuts.feature_cuts(0);
        assert!(c.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bin_and_threshold_agree() {
        let x = Array2::from_shape_fn((500, 2), |(i, j)| ((i * 37 + j * 11) % 97) as f32 * 1.5);
        let binned = BinnedMatrix::from_features(x.view(), 32, Parallelism::Parallel);
        let cuts = binned.cuts();

        for f in 0..2 {
            let bins = binned.feature_bins(f);
            for b in 0..cuts.n_bins(f) - 1 {
                let threshold = cuts.threshold(f, b);
                for (row, &bin) in bins.iter().enumerate() {
                    assert_eq!((bin as usize) <= b, x[[row, f]] < threshold);
                }
            }
        }
    }

    #[test]
    fn adjacent_floats_still_separate() {
        let a = 1.0f32;
        let b = f32::from_bits(a.to_bits() + 1);
        let c = midpoint(a, b);
        assert!(c > a && c <= b);
    }
}
