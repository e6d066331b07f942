//! GBDT trainer.
//!
//! Orchestrates objective computation, tree growing, and prediction updates.
//! Use [`GBDTTrainer::train`] to fit a [`Forest`] on a dense feature matrix.

use ndarray::{ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::binning::BinnedMatrix;
use super::gradients::Gradients;
use super::grower::{GrowerParams, GrowthStrategy, TreeGrower};
use super::logger::{TrainingLogger, Verbosity};
use super::metrics::{MetricFn, Rmse};
use super::objective::ObjectiveFn;
use super::split::GainParams;
use crate::repr::Forest;
use crate::utils::Parallelism;

// =============================================================================
// GBDTParams
// =============================================================================

/// Parameters for GBDT training.
#[derive(Clone, Debug)]
pub struct GBDTParams {
    // --- Boosting parameters ---
    /// Number of boosting rounds (trees to train).
    pub n_trees: u32,
    /// Learning rate (shrinkage).
    pub learning_rate: f32,

    // --- Tree structure ---
    pub growth_strategy: GrowthStrategy,
    /// Maximum histogram bins per feature.
    pub max_bins: usize,

    // --- Regularization ---
    pub gain: GainParams,

    // --- Sampling ---
    /// Fraction of rows drawn (without replacement) for each tree.
    pub subsample: f32,

    // --- Logging ---
    pub verbosity: Verbosity,

    // --- Reproducibility ---
    pub seed: u64,
}

impl Default for GBDTParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.2,
            growth_strategy: GrowthStrategy::default(),
            max_bins: 255,
            gain: GainParams::default(),
            subsample: 1.0,
            verbosity: Verbosity::default(),
            seed: 42,
        }
    }
}

impl GBDTParams {
    fn to_grower_params(&self) -> GrowerParams {
        GrowerParams {
            gain: self.gain.clone(),
            learning_rate: self.learning_rate,
            growth_strategy: self.growth_strategy,
        }
    }
}

// =============================================================================
// GBDTTrainer
// =============================================================================

/// GBDT trainer.
pub struct GBDTTrainer<O: ObjectiveFn> {
    objective: O,
    params: GBDTParams,
}

impl<O: ObjectiveFn> GBDTTrainer<O> {
    pub fn new(objective: O, params: GBDTParams) -> Self {
        Self { objective, params }
    }

    /// Train a forest.
    ///
    /// **Note:** This method does NOT create a thread pool. The caller sets up
    /// parallelism via [`run_with_threads`](crate::run_with_threads) if desired.
    ///
    /// # Arguments
    ///
    /// * `features` - Row-major matrix `(n_rows, n_features)` of finite values
    /// * `targets` - One target per row
    /// * `parallelism` - Sequential or Parallel iteration hint
    ///
    /// Training is deterministic for fixed inputs, parameters and seed,
    /// regardless of `parallelism`.
    pub fn train(&self, features: ArrayView2<f32>, targets: &[f32], parallelism: Parallelism) -> Forest {
        let features = features.as_standard_layout();
        let (n_rows, n_features) = features.dim();
        debug_assert_eq!(targets.len(), n_rows);

        let binned = BinnedMatrix::from_features(features.view(), self.params.max_bins, parallelism);
        let mut grower = TreeGrower::new(self.params.to_grower_params(), parallelism);
        let mut gradients = Gradients::new(n_rows);
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let all_rows: Vec<u32> = (0..n_rows as u32).collect();

        let base_score = self.objective.base_score(targets);
        let mut predictions = vec![base_score; n_rows];
        let mut forest = Forest::new(n_features).with_base_score(base_score);

        let mut logger = TrainingLogger::new(self.params.verbosity);
        logger.start_training(self.params.n_trees as usize, n_rows, n_features);
        if (0..n_features).all(|f| binned.cuts().n_bins(f) == 1) {
            logger.warn("every feature is constant; trees will not split");
        }

        let targets_view = ArrayView1::from(targets);
        for round in 0..self.params.n_trees as usize {
            self.objective
                .compute_gradients(&predictions, targets, &mut gradients);

            let sampled = sample_rows(&mut rng, n_rows, self.params.subsample);
            let rows = sampled.as_deref().unwrap_or(&all_rows);
            let tree = grower.grow(&binned, &gradients, rows).freeze();

            if sampled.is_none() {
                // Every row took part, so the partitioner knows each row's leaf.
                grower.update_predictions(&tree, &mut predictions);
            } else {
                for (pred, row) in predictions.iter_mut().zip(features.rows()) {
                    let row = row.as_slice().expect("standard layout rows are contiguous");
                    *pred += tree.predict_row(row);
                }
            }
            forest.push_tree(tree);

            if logger.enabled(Verbosity::Debug) {
                let rmse = Rmse.compute(ArrayView1::from(&predictions), targets_view);
                logger.log_round(round, Rmse.name(), rmse);
            }
        }

        let rmse = Rmse.compute(ArrayView1::from(&predictions), targets_view);
        logger.finish_training(forest.n_trees(), Rmse.name(), rmse);
        forest
    }
}

/// Draw `round(n_rows * subsample)` distinct rows (at least one), sorted.
/// Returns `None` when every row is used.
fn sample_rows(rng: &mut StdRng, n_rows: usize, subsample: f32) -> Option<Vec<u32>> {
    if subsample >= 1.0 || n_rows == 0 {
        return None;
    }
    let amount = ((n_rows as f64 * subsample as f64).round() as usize).clamp(1, n_rows);
    let mut rows: Vec<u32> = rand::seq::index::sample(rng, n_rows, amount)
        .into_iter()
        .map(|i| i as u32)
        .collect();
    rows.sort_unstable();
    Some(rows)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::Array2;

    use super::*;
    use crate::training::SquaredLoss;

    fn linear_data(n: usize) -> (Array2<f32>, Vec<f32>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i * (j + 3) * 7919) % 101) as f32);
        let y = x
            .rows()
            .into_iter()
            .map(|r| 1000.0 * r[0] + 50.0 * r[1] + 100_000.0)
            .collect();
        (x, y)
    }

    fn r2(forest: &Forest, x: &Array2<f32>, y: &[f32]) -> f64 {
        let preds: Vec<f32> = x
            .rows()
            .into_iter()
            .map(|r| forest.predict_row(r.as_slice().unwrap()))
            .collect();
        crate::training::RSquared.compute(ArrayView1::from(&preds), ArrayView1::from(y))
    }

    #[test]
    fn fits_training_data() {
        let (x, y) = linear_data(300);
        let params = GBDTParams {
            gain: GainParams {
                min_samples_leaf: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let forest = GBDTTrainer::new(SquaredLoss, params).train(x.view(), &y, Parallelism::Sequential);

        assert_eq!(forest.n_trees(), 100);
        assert!(forest.validate().is_ok());
        assert!(r2(&forest, &x, &y) > 0.99);
    }

    #[test]
    fn base_score_is_target_mean() {
        let (x, y) = linear_data(50);
        let params = GBDTParams {
            n_trees: 1,
            ..Default::default()
        };
        let forest = GBDTTrainer::new(SquaredLoss, params).train(x.view(), &y, Parallelism::Sequential);
        let mean = y.iter().map(|&v| v as f64).sum::<f64>() / y.len() as f64;
        assert_relative_eq!(forest.base_score() as f64, mean, max_relative = 1e-6);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let (x, y) = linear_data(200);
        let params = GBDTParams {
            n_trees: 20,
            subsample: 0.7,
            ..Default::default()
        };
        let trainer = GBDTTrainer::new(SquaredLoss, params);
        let seq = trainer.train(x.view(), &y, Parallelism::Sequential);
        let par = trainer.train(x.view(), &y, Parallelism::Parallel);
        assert_eq!(seq, par);
    }

    #[test]
    fn subsampling_depends_on_seed() {
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(1);
        assert_eq!(sample_rows(&mut a, 100, 0.5), sample_rows(&mut b, 100, 0.5));

        let rows = sample_rows(&mut a, 100, 0.5).unwrap();
        assert_eq!(rows.len(), 50);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
        assert!(sample_rows(&mut a, 100, 1.0).is_none());
    }
}
