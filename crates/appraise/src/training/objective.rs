//! Training objectives.

use super::gradients::Gradients;

/// A differentiable loss the trainer minimizes.
pub trait ObjectiveFn: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Write per-row gradients and hessians for the current predictions.
    fn compute_gradients(&self, predictions: &[f32], targets: &[f32], gradients: &mut Gradients);

    /// Constant prediction that minimizes the loss before any tree is added.
    fn base_score(&self, targets: &[f32]) -> f32;
}

/// Squared error loss for regression.
///
/// - Loss: `0.5 * (pred - target)²`
/// - Gradient: `pred - target`
/// - Hessian: `1.0`
/// - Base score: mean target
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredLoss;

impl ObjectiveFn for SquaredLoss {
    fn name(&self) -> &'static str {
        "squared_error"
    }

    fn compute_gradients(&self, predictions: &[f32], targets: &[f32], gradients: &mut Gradients) {
        debug_assert_eq!(predictions.len(), targets.len());
        debug_assert_eq!(predictions.len(), gradients.n_rows());

        let (grads, hess) = gradients.as_mut_slices();
        for (i, (&p, &y)) in predictions.iter().zip(targets).enumerate() {
            grads[i] = p - y;
            hess[i] = 1.0;
        }
    }

    fn base_score(&self, targets: &[f32]) -> f32 {
        if targets.is_empty() {
            return 0.0;
        }
        let sum: f64 = targets.iter().map(|&y| y as f64).sum();
        (sum / targets.len() as f64) as f32
    }
}
