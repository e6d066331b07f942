//! Model metadata.
//!
//! Introspection data recorded at training time and persisted with the model.

use serde::{Deserialize, Serialize};

use crate::normalize::Normalization;
use crate::training::RegressionMetrics;

/// Training context of a [`PriceModel`](super::PriceModel).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Number of features the forest consumes.
    pub n_features: usize,
    /// Number of records the model was trained on.
    pub n_train_rows: usize,
    /// Mean training target; the forest's base score.
    pub base_score: f32,
    /// Normalization applied before the forest.
    pub normalization: Normalization,
    /// Seed used for row subsampling.
    pub seed: u64,
    /// Fit on the training records, if measured.
    pub train_metrics: Option<RegressionMetrics>,
    /// Version of this crate that produced the model.
    pub crate_version: String,
}

impl ModelMeta {
    /// Create metadata for a freshly trained model.
    pub fn for_training(n_features: usize, n_train_rows: usize) -> Self {
        Self {
            n_features,
            n_train_rows,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_score(mut self, base_score: f32) -> Self {
        self.base_score = base_score;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set training-set metrics.
    pub fn with_train_metrics(mut self, metrics: RegressionMetrics) -> Self {
        self.train_metrics = Some(metrics);
        self
    }
}
