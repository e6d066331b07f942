//! Explicit pipeline context.
//!
//! A [`Session`] bundles the training configuration with the feature
//! extractor, so training, evaluation and prediction all share the same
//! record-to-vector path. Nothing is process-wide: two sessions with
//! different settings can run side by side.

use ndarray::ArrayView1;

use crate::data::{HouseRecord, Prediction};
use crate::error::{Error, Result};
use crate::features::FeatureExtractor;
use crate::model::{PriceModel, PriceModelConfig};
use crate::training::RegressionMetrics;
use crate::utils::run_with_threads;

/// Configuration plus extractor for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: PriceModelConfig,
    extractor: FeatureExtractor,
}

impl Session {
    /// Session with the standard 10-field extractor.
    pub fn new(config: PriceModelConfig) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::standard(),
        }
    }

    /// Replace the extractor.
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &PriceModelConfig {
        &self.config
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Train a model on labelled records.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] if `records` is empty
    /// - [`Error::InvalidRecord`] if a record has a bad field or no sale price
    pub fn fit(&self, records: &[HouseRecord]) -> Result<PriceModel> {
        if records.is_empty() {
            return Err(Error::InsufficientData("cannot fit on zero records"));
        }
        run_with_threads(self.config.thread_count(), |parallelism| {
            let features = self.extractor.extract_matrix(records, parallelism)?;
            let targets = self.extractor.targets(records)?;
            tracing::debug!(
                n_records = records.len(),
                n_features = self.extractor.n_features(),
                "features extracted"
            );
            PriceModel::train_inner(
                features.view(),
                &targets,
                self.extractor.schema().clone(),
                &self.config,
                parallelism,
            )
        })
    }

    /// Score `model` on labelled records.
    ///
    /// Evaluating on the records the model was fitted on measures fit, not
    /// generalization.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] if `records` is empty
    /// - [`Error::InvalidSchema`] if this session's extractor does not match
    ///   the schema the model was trained with
    /// - [`Error::InvalidRecord`] if a record has a bad field or no sale price
    pub fn evaluate(&self, model: &PriceModel, records: &[HouseRecord]) -> Result<RegressionMetrics> {
        model.schema().ensure_same_layout(self.extractor.schema())?;
        if records.is_empty() {
            return Err(Error::InsufficientData("cannot evaluate on zero records"));
        }
        run_with_threads(self.config.thread_count(), |parallelism| {
            let features = self.extractor.extract_matrix(records, parallelism)?;
            let targets = self.extractor.targets(records)?;
            let predictions = model.predict_matrix(features.view(), parallelism)?;
            Ok(RegressionMetrics::compute(
                ArrayView1::from(&predictions),
                ArrayView1::from(&targets),
            ))
        })
    }

    /// Predict the sale price of one house. The record's own sale price, if
    /// any, is ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSchema`] if the extractor disagrees with the model
    /// - [`Error::InvalidRecord`] if a feature field is missing or invalid
    pub fn predict(&self, model: &PriceModel, record: &HouseRecord) -> Result<Prediction> {
        model.schema().ensure_same_layout(self.extractor.schema())?;
        let features = self.extractor.extract(record)?;
        Ok(Prediction {
            sale_price: model.predict_vector(&features)?,
        })
    }

    /// Predict many houses against the read-only model, in parallel when
    /// the configuration allows. Results are in input order and identical to
    /// calling [`predict`](Self::predict) per record.
    pub fn predict_batch(&self, model: &PriceModel, records: &[HouseRecord]) -> Result<Vec<Prediction>> {
        model.schema().ensure_same_layout(self.extractor.schema())?;
        run_with_threads(self.config.thread_count(), |parallelism| {
            let features = self.extractor.extract_matrix(records, parallelism)?;
            let predictions = model.predict_matrix(features.view(), parallelism)?;
            Ok(predictions
                .into_iter()
                .map(|sale_price| Prediction { sale_price })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureField, FeatureSchema};
    use crate::model::RegularizationParams;
    use crate::testing::{reference_house, synthetic_houses};

    fn quick_session() -> Session {
        Session::new(
            PriceModelConfig::builder()
                .n_trees(20)
                .regularization(RegularizationParams {
                    min_samples_leaf: 2,
                    ..Default::default()
                })
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn fit_empty_is_insufficient_data() {
        let err = quick_session().fit(&[]).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn fit_without_target_is_invalid_record() {
        let mut records = synthetic_houses(10, 1);
        records[6] = records[6].without_sale_price();
        let err = quick_session().fit(&records).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRecord { row: Some(6), ref field, .. } if field == "sale_price"
        ));
    }

    #[test]
    fn evaluate_empty_is_insufficient_data() {
        let session = quick_session();
        let model = session.fit(&synthetic_houses(30, 2)).unwrap();
        assert!(matches!(
            session.evaluate(&model, &[]),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn predict_ignores_record_price() {
        let session = quick_session();
        let model = session.fit(&synthetic_houses(50, 3)).unwrap();
        let a = session.predict(&model, &reference_house()).unwrap();
        let b = session
            .predict(&model, &reference_house().with_sale_price(1.0))
            .unwrap();
        let c = session
            .predict(&model, &reference_house().without_sale_price())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn reordered_extractor_is_rejected() {
        let session = quick_session();
        let model = session.fit(&synthetic_houses(30, 4)).unwrap();

        let mut fields = FeatureField::ALL.to_vec();
        fields.swap(0, 1);
        let reordered = quick_session().with_extractor(FeatureExtractor::new(FeatureSchema::new(fields)));
        assert!(matches!(
            reordered.predict(&model, &reference_house()),
            Err(Error::InvalidSchema { .. })
        ));
        assert!(matches!(
            reordered.predict_batch(&model, &[reference_house()]),
            Err(Error::InvalidSchema { .. })
        ));
    }
}
