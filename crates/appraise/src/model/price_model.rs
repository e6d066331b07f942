//! Trained price model.
//!
//! High-level wrapper around [`Forest`] with training and prediction. A
//! [`PriceModel`] is produced only by [`PriceModel::train`] or by loading a
//! persisted artifact and is never mutated afterwards, so it can be shared
//! freely across threads.

use ndarray::{ArrayView1, ArrayView2};

use super::{ModelMeta, PriceModelConfig};
use crate::error::{Error, Result};
use crate::features::{FeatureSchema, FeatureVector};
use crate::inference::Predictor;
use crate::normalize::{MinMaxScaler, Normalization};
use crate::repr::Forest;
use crate::training::{GBDTTrainer, RegressionMetrics, SquaredLoss};
use crate::utils::{Parallelism, run_with_threads};

/// Immutable trained model: forest, feature schema, optional scaler and
/// metadata.
#[derive(Clone, PartialEq)]
pub struct PriceModel {
    forest: Forest,
    schema: FeatureSchema,
    scaler: Option<MinMaxScaler>,
    meta: ModelMeta,
}

impl PriceModel {
    /// Assemble a model from already consistent parts.
    pub(crate) fn from_parts(
        forest: Forest,
        schema: FeatureSchema,
        scaler: Option<MinMaxScaler>,
        meta: ModelMeta,
    ) -> Self {
        Self {
            forest,
            schema,
            scaler,
            meta,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Feature schema the model was trained with.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Fitted scaler, present when the model was trained with normalization.
    pub fn scaler(&self) -> Option<&MinMaxScaler> {
        self.scaler.as_ref()
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn normalization(&self) -> Normalization {
        self.meta.normalization
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.schema.n_features()
    }

    // =========================================================================
    // Training
    // =========================================================================

    /// Train a model on an extracted feature matrix.
    ///
    /// # Arguments
    ///
    /// * `features` - Row-major matrix `(n_rows, schema.n_features())`
    /// * `targets` - Sale price per row
    /// * `schema` - Layout the columns of `features` follow
    /// * `config` - Training configuration; its `n_threads` sets up the pool
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `config` does not validate,
    /// [`Error::InsufficientData`] for an empty matrix or a target count that
    /// differs from the row count, [`Error::InvalidSchema`] if the column
    /// count disagrees with `schema`.
    pub fn train(
        features: ArrayView2<f32>,
        targets: &[f32],
        schema: FeatureSchema,
        config: &PriceModelConfig,
    ) -> Result<Self> {
        run_with_threads(config.thread_count(), |parallelism| {
            Self::train_inner(features, targets, schema, config, parallelism)
        })
    }

    /// Training without thread pool management.
    pub(crate) fn train_inner(
        features: ArrayView2<f32>,
        targets: &[f32],
        schema: FeatureSchema,
        config: &PriceModelConfig,
        parallelism: Parallelism,
    ) -> Result<Self> {
        // Public fields and serde both bypass `build()`.
        config.validate()?;

        let (n_rows, n_features) = features.dim();
        if n_rows == 0 {
            return Err(Error::InsufficientData("no training records"));
        }
        if targets.len() != n_rows {
            return Err(Error::InsufficientData("every training row needs a target"));
        }
        if n_features != schema.n_features() {
            return Err(arity_mismatch(&schema, n_features));
        }

        let (scaler, forest) = match config.normalization {
            Normalization::None => {
                let forest = GBDTTrainer::new(SquaredLoss, config.to_gbdt_params()).train(
                    features,
                    targets,
                    parallelism,
                );
                (None, forest)
            }
            Normalization::MinMax => {
                let scaler = MinMaxScaler::fit(features);
                let mut scaled = features.to_owned();
                scaler.transform(scaled.view_mut());
                let forest = GBDTTrainer::new(SquaredLoss, config.to_gbdt_params()).train(
                    scaled.view(),
                    targets,
                    parallelism,
                );
                (Some(scaler), forest)
            }
        };

        let meta = ModelMeta::for_training(n_features, n_rows)
            .with_base_score(forest.base_score())
            .with_normalization(config.normalization)
            .with_seed(config.seed);
        let mut model = Self::from_parts(forest, schema, scaler, meta);

        let predictions = model.predict_matrix(features, parallelism)?;
        let metrics = RegressionMetrics::compute(ArrayView1::from(&predictions), ArrayView1::from(targets));
        model.meta = model.meta.with_train_metrics(metrics);
        Ok(model)
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Predict the sale price for one feature vector.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSchema`] if the vector length differs from the model's
    /// feature count. Vectors are never truncated or padded.
    pub fn predict_vector(&self, features: &FeatureVector) -> Result<f32> {
        if features.len() != self.n_features() {
            return Err(arity_mismatch(&self.schema, features.len()));
        }
        match &self.scaler {
            Some(scaler) => {
                let mut row = features.as_slice().to_vec();
                scaler.transform_row(&mut row);
                Ok(self.forest.predict_row(&row))
            }
            None => Ok(self.forest.predict_row(features.as_slice())),
        }
    }

    /// Predict every row of a `(n_rows, n_features)` matrix.
    ///
    /// Results are identical to calling [`predict_vector`](Self::predict_vector)
    /// per row, for either `parallelism`.
    pub fn predict_matrix(&self, features: ArrayView2<f32>, parallelism: Parallelism) -> Result<Vec<f32>> {
        if features.ncols() != self.n_features() {
            return Err(arity_mismatch(&self.schema, features.ncols()));
        }
        let predictor = Predictor::new(&self.forest);
        match &self.scaler {
            Some(scaler) => {
                let mut scaled = features.as_standard_layout().into_owned();
                scaler.transform(scaled.view_mut());
                Ok(predictor.predict(scaled.view(), parallelism))
            }
            None => Ok(predictor.predict(features, parallelism)),
        }
    }
}

/// A raw vector or matrix whose width disagrees with the model schema.
fn arity_mismatch(schema: &FeatureSchema, found: usize) -> Error {
    Error::InvalidSchema {
        expected: schema.feature_names(),
        found: (0..found).map(|i| format!("#{i}")).collect(),
    }
}

impl std::fmt::Debug for PriceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceModel")
            .field("n_trees", &self.forest.n_trees())
            .field("n_features", &self.n_features())
            .field("normalization", &self.meta.normalization)
            .field("base_score", &self.forest.base_score())
            .finish()
    }
}
