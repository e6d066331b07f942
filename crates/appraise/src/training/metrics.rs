//! Regression metrics.
//!
//! All metrics accumulate in `f64`. Empty inputs yield `0.0`; callers that
//! need to reject empty sets do so before computing.

use std::fmt;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A scalar quality measure of predictions against targets.
pub trait MetricFn: Send + Sync {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64;

    fn name(&self) -> &'static str;
}

fn residuals<'a, 'b>(predictions: ArrayView1<'a, f32>, targets: ArrayView1<'b, f32>) -> impl Iterator<Item = f64> {
    debug_assert_eq!(predictions.len(), targets.len());
    predictions
        .into_iter()
        .zip(targets)
        .map(|(&p, &t)| p as f64 - t as f64)
}

// =============================================================================
// RMSE / MSE / MAE
// =============================================================================

/// Mean Squared Error: mean((pred - target)²)
#[derive(Debug, Clone, Copy, Default)]
pub struct Mse;

impl MetricFn for Mse {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64 {
        let n = predictions.len();
        if n == 0 {
            return 0.0;
        }
        residuals(predictions, targets).map(|d| d * d).sum::<f64>() / n as f64
    }

    fn name(&self) -> &'static str {
        "mse"
    }
}

/// Root Mean Squared Error: sqrt(mean((pred - target)²))
#[derive(Debug, Clone, Copy, Default)]
pub struct Rmse;

impl MetricFn for Rmse {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64 {
        Mse.compute(predictions, targets).sqrt()
    }

    fn name(&self) -> &'static str {
        "rmse"
    }
}

/// Mean Absolute Error: mean(|pred - target|)
#[derive(Debug, Clone, Copy, Default)]
pub struct Mae;

impl MetricFn for Mae {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64 {
        let n = predictions.len();
        if n == 0 {
            return 0.0;
        }
        residuals(predictions, targets).map(f64::abs).sum::<f64>() / n as f64
    }

    fn name(&self) -> &'static str {
        "mae"
    }
}

// =============================================================================
// R²
// =============================================================================

/// Coefficient of determination: `1 - SS_res / SS_tot`.
///
/// The baseline is the mean of the observed targets. When the targets are
/// constant (`SS_tot = 0`) the result is `1.0` for a perfect fit and `0.0`
/// otherwise. Never exceeds `1.0`; may be negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct RSquared;

impl MetricFn for RSquared {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64 {
        let n = targets.len();
        if n == 0 {
            return 0.0;
        }
        let mean = targets.iter().map(|&t| t as f64).sum::<f64>() / n as f64;
        let ss_tot: f64 = targets.iter().map(|&t| (t as f64 - mean).powi(2)).sum();
        let ss_res: f64 = residuals(predictions, targets).map(|d| d * d).sum();

        if ss_tot == 0.0 {
            if ss_res == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        }
    }

    fn name(&self) -> &'static str {
        "r_squared"
    }
}

// =============================================================================
// RegressionMetrics
// =============================================================================

/// Fit-quality summary produced by evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Coefficient of determination.
    pub r_squared: f64,
    pub rmse: f64,
    pub mse: f64,
    pub mae: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn compute(predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Self {
        let mse = Mse.compute(predictions, targets);
        Self {
            r_squared: RSquared.compute(predictions, targets),
            rmse: mse.sqrt(),
            mse,
            mae: Mae.compute(predictions, targets),
            n_samples: targets.len(),
        }
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R^2: {:.4}, RMSE: {:.2}, MAE: {:.2} (n = {})",
            self.r_squared, self.rmse, self.mae, self.n_samples
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn perfect_predictions() {
        let t = array![1.0f32, 2.0, 3.0];
        let m = RegressionMetrics::compute(t.view(), t.view());
        assert_eq!(m.r_squared, 1.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.n_samples, 3);
    }

    #[test]
    fn known_values() {
        let p = array![2.0f32, 2.0, 4.0];
        let t = array![1.0f32, 2.0, 3.0];

        assert_relative_eq!(Mse.compute(p.view(), t.view()), 2.0 / 3.0);
        assert_relative_eq!(Rmse.compute(p.view(), t.view()), (2.0f64 / 3.0).sqrt());
        assert_relative_eq!(Mae.compute(p.view(), t.view()), 2.0 / 3.0);
        // SS_tot = 2, SS_res = 2
        assert_relative_eq!(RSquared.compute(p.view(), t.view()), 0.0);
    }

    #[test]
    fn mean_predictor_scores_zero_and_worse_is_negative() {
        let t = array![1.0f32, 2.0, 3.0];
        let mean = array![2.0f32, 2.0, 2.0];
        assert_relative_eq!(RSquared.compute(mean.view(), t.view()), 0.0);

        let bad = array![3.0f32, 2.0, 1.0];
        assert!(RSquared.compute(bad.view(), t.view()) < 0.0);
    }

    #[test]
    fn constant_targets() {
        let t = array![5.0f32, 5.0];
        assert_eq!(RSquared.compute(t.view(), t.view()), 1.0);
        let p = array![4.0f32, 6.0];
        assert_eq!(RSquared.compute(p.view(), t.view()), 0.0);
    }

    #[test]
    fn views_with_unrelated_lifetimes() {
        let predictions = vec![1.0f32, 2.0, 4.0];
        let p = ArrayView1::from(&predictions);
        let mse = {
            let targets = array![1.0f32, 2.0, 3.0];
            Mse.compute(p, targets.view())
        };
        assert_relative_eq!(mse, 1.0 / 3.0);
    }

    #[test]
    fn metric_names() {
        assert_eq!(Rmse.name(), "rmse");
        assert_eq!(RSquared.name(), "r_squared");
    }
}
