//! End-to-end tests for the fit → evaluate → predict pipeline.
//!
//! These exercise the public [`Session`] API only, on deterministic
//! synthetic Ames-like records.

use std::num::NonZeroUsize;

use appraise::model::RegularizationParams;
use appraise::testing::{noisy_copies, reference_house, synthetic_houses};
use appraise::{
    Error, FeatureExtractor, FeatureField, FeatureSchema, Normalization, PriceModelConfig, Session,
};

fn session_with(n_threads: usize, normalization: Normalization) -> Session {
    let config = PriceModelConfig::builder()
        .n_trees(60)
        .learning_rate(0.2)
        .normalization(normalization)
        .n_threads(NonZeroUsize::new(n_threads).unwrap())
        .build()
        .unwrap();
    Session::new(config)
}

// =============================================================================
// Input validation
// =============================================================================

#[test]
fn fit_on_no_records_is_insufficient_data() {
    let err = Session::default().fit(&[]).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)), "{err}");
}

#[test]
fn fit_with_unlabelled_record_is_invalid_record() {
    let mut records = synthetic_houses(40, 11);
    records[17].sale_price = None;
    let err = session_with(1, Normalization::None).fit(&records).unwrap_err();
    assert!(
        matches!(err, Error::InvalidRecord { row: Some(17), ref field, .. } if field == "sale_price"),
        "{err}"
    );
}

#[test]
fn fit_with_negative_area_is_invalid_record() {
    let mut records = synthetic_houses(40, 12);
    records[3].lot_area = -1.0;
    let err = session_with(1, Normalization::None).fit(&records).unwrap_err();
    assert!(
        matches!(err, Error::InvalidRecord { ref field, .. } if field == "lot_area"),
        "{err}"
    );
}

#[test]
fn predict_with_missing_field_is_invalid_record() {
    let session = session_with(1, Normalization::None);
    let model = session.fit(&synthetic_houses(80, 13)).unwrap();

    let mut house = reference_house();
    house.garage_area = f32::NAN;
    let err = session.predict(&model, &house).unwrap_err();
    assert!(matches!(err, Error::InvalidRecord { ref field, .. } if field == "garage_area"));
}

#[test]
fn narrower_extractor_is_rejected_by_wider_model() {
    let session = session_with(1, Normalization::None);
    let model = session.fit(&synthetic_houses(80, 14)).unwrap();
    assert_eq!(model.n_features(), 10);

    let nine: Vec<FeatureField> = FeatureField::ALL
        .into_iter()
        .filter(|f| *f != FeatureField::LotArea)
        .collect();
    let narrow = session_with(1, Normalization::None).with_extractor(FeatureExtractor::new(FeatureSchema::new(nine)));

    let err = narrow.predict(&model, &reference_house()).unwrap_err();
    match err {
        Error::InvalidSchema { expected, found } => {
            assert_eq!(expected.len(), 10);
            assert_eq!(found.len(), 9);
        }
        other => panic!("expected InvalidSchema, got {other}"),
    }
    assert!(matches!(
        narrow.evaluate(&model, &synthetic_houses(5, 1)),
        Err(Error::InvalidSchema { .. })
    ));
}

#[test]
fn out_of_range_config_fields_are_rejected_at_fit() {
    let records = synthetic_houses(60, 15);

    let mut zero_bins = PriceModelConfig::default();
    zero_bins.tree.max_bins = 0;
    let mut nan_rate = PriceModelConfig::default();
    nan_rate.learning_rate = f32::NAN;

    for config in [zero_bins, nan_rate] {
        let err = Session::new(config).fit(&records).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err}");
    }
}

#[test]
fn deserialized_config_is_validated_at_fit() {
    let config: PriceModelConfig = serde_json::from_str(r#"{"n_trees": 0, "learning_rate": -1.0}"#).unwrap();
    let err = Session::new(config).fit(&synthetic_houses(60, 16)).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
}

// =============================================================================
// Fit quality
// =============================================================================

#[test]
fn synthetic_fit_scores_high_r_squared() {
    let records = synthetic_houses(1000, 42);
    for normalization in [Normalization::None, Normalization::MinMax] {
        let session = session_with(2, normalization);
        let model = session.fit(&records).unwrap();
        let metrics = session.evaluate(&model, &records).unwrap();

        assert_eq!(metrics.n_samples, 1000);
        assert!(metrics.r_squared <= 1.0);
        assert!(
            metrics.r_squared > 0.9,
            "{normalization:?}: R^2 = {}",
            metrics.r_squared
        );
        assert!(metrics.rmse >= 0.0);

        let stored = model.meta().train_metrics.expect("training metrics recorded");
        assert!((stored.r_squared - metrics.r_squared).abs() < 1e-9);
    }
}

#[test]
fn reference_house_is_priced_near_its_neighbours() {
    let records = noisy_copies(&reference_house(), 200, 0.01, 7);
    let config = PriceModelConfig::builder()
        .n_trees(50)
        .regularization(RegularizationParams {
            min_samples_leaf: 2,
            ..Default::default()
        })
        .build()
        .unwrap();
    let session = Session::new(config);
    let model = session.fit(&records).unwrap();

    let price = session.predict(&model, &reference_house()).unwrap().sale_price;
    let relative_error = (price - 200_000.0).abs() / 200_000.0;
    assert!(relative_error < 0.02, "predicted {price}");
}

// =============================================================================
// Determinism and concurrency
// =============================================================================

#[test]
fn prediction_is_deterministic() {
    let session = session_with(1, Normalization::None);
    let model = session.fit(&synthetic_houses(300, 5)).unwrap();
    let house = reference_house();

    let first = session.predict(&model, &house).unwrap();
    for _ in 0..10 {
        assert_eq!(session.predict(&model, &house).unwrap(), first);
    }
}

#[test]
fn training_is_reproducible() {
    let records = synthetic_houses(300, 6);
    let session = session_with(1, Normalization::MinMax);
    assert_eq!(session.fit(&records).unwrap(), session.fit(&records).unwrap());
}

#[test]
fn parallel_and_sequential_agree() {
    let records = synthetic_houses(500, 8);
    let houses = synthetic_houses(257, 9);

    let sequential = session_with(1, Normalization::None);
    let parallel = session_with(4, Normalization::None);

    let model_seq = sequential.fit(&records).unwrap();
    let model_par = parallel.fit(&records).unwrap();
    assert_eq!(model_seq, model_par);

    let batch_seq = sequential.predict_batch(&model_seq, &houses).unwrap();
    let batch_par = parallel.predict_batch(&model_seq, &houses).unwrap();
    assert_eq!(batch_seq, batch_par);

    for (house, batched) in houses.iter().zip(&batch_par) {
        assert_eq!(parallel.predict(&model_seq, house).unwrap(), *batched);
    }
}

#[test]
fn concurrent_predictions_share_one_model() {
    let session = session_with(1, Normalization::MinMax);
    let model = session.fit(&synthetic_houses(200, 10)).unwrap();
    let expected = session.predict(&model, &reference_house()).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| session.predict(&model, &reference_house()).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
