//! Block-based batch predictor for tree ensembles.
//!
//! Rows are processed in blocks; within a block the trees form the outer
//! loop so each tree's nodes stay in cache while it is applied to every row
//! of the block. Blocks are independent and run in parallel when allowed.
//! Per-row accumulation follows the same order as
//! [`Forest::predict_row`], so batch and single-row results are identical.

use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::repr::Forest;
use crate::utils::Parallelism;

/// Default block size for batch processing.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Read-only predictor over a [`Forest`].
#[derive(Debug, Clone, Copy)]
pub struct Predictor<'f> {
    forest: &'f Forest,
    block_size: usize,
}

impl<'f> Predictor<'f> {
    pub fn new(forest: &'f Forest) -> Self {
        Self {
            forest,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Override the number of rows per block (minimum 1).
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    #[inline]
    pub fn forest(&self) -> &'f Forest {
        self.forest
    }

    /// Predict one row.
    #[inline]
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        self.forest.predict_row(features)
    }

    /// Predict every row of a `(n_rows, n_features)` matrix.
    pub fn predict(&self, features: ArrayView2<f32>, parallelism: Parallelism) -> Vec<f32> {
        debug_assert_eq!(features.ncols(), self.forest.n_features());
        let features = features.as_standard_layout();
        let mut output = vec![0.0f32; features.nrows()];
        let block_size = self.block_size;
        let forest = self.forest;

        let predict_block = |(block_idx, out): (usize, &mut [f32])| {
            let start = block_idx * block_size;
            let mut acc = vec![forest.base_score() as f64; out.len()];
            for tree in forest.trees() {
                for (i, a) in acc.iter_mut().enumerate() {
                    let row = features.row(start + i);
                    let row = row.as_slice().expect("standard layout rows are contiguous");
                    *a += tree.predict_row(row) as f64;
                }
            }
            for (o, a) in out.iter_mut().zip(acc) {
                *o = a as f32;
            }
        };

        if parallelism.is_parallel() {
            output
                .par_chunks_mut(block_size)
                .enumerate()
                .for_each(predict_block);
        } else {
            output.chunks_mut(block_size).enumerate().for_each(predict_block);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::repr::MutableTree;

    fn forest() -> Forest {
        let mut forest = Forest::new(2).with_base_score(1000.0);
        for (feature, threshold) in [(0u32, 3.0f32), (1, 50.0), (0, 7.5)] {
            let mut t = MutableTree::new();
            let root = t.init_root();
            let (l, r) = t.apply_numeric_split(root, feature, threshold);
            t.make_leaf(l, -threshold);
            t.make_leaf(r, threshold * 0.1);
            forest.push_tree(t.freeze());
        }
        forest
    }

    #[test]
    fn batch_matches_single_row() {
        let forest = forest();
        let x = Array2::from_shape_fn((150, 2), |(i, j)| (i * (j + 1)) as f32 * 0.1);

        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            for block_size in [1, 7, 64] {
                let preds = Predictor::new(&forest)
                    .with_block_size(block_size)
                    .predict(x.view(), parallelism);
                for (i, row) in x.rows().into_iter().enumerate() {
                    assert_eq!(preds[i], forest.predict_row(row.as_slice().unwrap()));
                }
            }
        }
    }

    #[test]
    fn non_standard_layout_input() {
        let forest = forest();
        let x = Array2::from_shape_fn((2, 10), |(j, i)| (i * (j + 1)) as f32);
        let xt = x.t();
        let preds = Predictor::new(&forest).predict(xt, Parallelism::Sequential);
        assert_eq!(preds.len(), 10);
        assert_eq!(preds[4], forest.predict_row(&[4.0, 8.0]));
    }

    #[test]
    fn empty_batch() {
        let forest = forest();
        let x = Array2::<f32>::zeros((0, 2));
        assert!(Predictor::new(&forest).predict(x.view(), Parallelism::Parallel).is_empty());
    }
}
