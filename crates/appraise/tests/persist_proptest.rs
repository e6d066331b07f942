//! Property-based tests for the persist module.
//!
//! These tests train small models on arbitrary finite data and verify that
//! both encodings reproduce the model and its predictions exactly.

use ndarray::Array2;
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use appraise::model::{RegularizationParams, TreeParams};
use appraise::persist::HEADER_SIZE;
use appraise::{
    FeatureExtractor, FeatureField, FeatureSchema, ModelFormat, ModelStore, Normalization, Parallelism, PriceModel,
    PriceModelConfig,
};

// =============================================================================
// Arbitrary Model Generators
// =============================================================================

/// Strategy for non-negative finite feature values.
fn arb_feature_value() -> impl Strategy<Value = f32> {
    prop::num::f32::ANY
        .prop_filter("must be finite", |x| x.is_finite())
        .prop_map(|x| x.abs().min(1e6))
}

/// Strategy for a prefix of the standard schema (1 to 10 fields).
fn arb_schema() -> impl Strategy<Value = FeatureSchema> {
    (1usize..=FeatureField::ALL.len()).prop_map(|n| FeatureSchema::new(FeatureField::ALL[..n].to_vec()))
}

fn arb_normalization() -> impl Strategy<Value = Normalization> {
    prop_oneof![Just(Normalization::None), Just(Normalization::MinMax)]
}

/// A model trained on `n_rows` arbitrary rows of the given schema.
fn arb_model() -> impl Strategy<Value = (PriceModel, Array2<f32>)> {
    (arb_schema(), 2usize..40, 1u32..6, 1u32..5, arb_normalization()).prop_flat_map(
        |(schema, n_rows, n_trees, max_depth, normalization)| {
            let n_features = schema.n_features();
            (
                prop_vec(arb_feature_value(), n_rows * n_features),
                prop_vec(0.0f32..1e6, n_rows),
            )
                .prop_map(move |(values, targets)| {
                    let features = Array2::from_shape_vec((n_rows, n_features), values).unwrap();
                    let config = PriceModelConfig::builder()
                        .n_trees(n_trees)
                        .tree(TreeParams::depth_wise(max_depth))
                        .regularization(RegularizationParams {
                            min_samples_leaf: 1,
                            ..Default::default()
                        })
                        .normalization(normalization)
                        .build()
                        .unwrap();
                    let model = PriceModel::train(features.view(), &targets, schema.clone(), &config).unwrap();
                    (model, features)
                })
        },
    )
}

// =============================================================================
// Round-trip Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn binary_roundtrip_preserves_model((model, features) in arb_model()) {
        let store = ModelStore::default();
        let restored = ModelStore::decode(&store.encode(&model).unwrap()).unwrap();

        prop_assert_eq!(&restored, &model);
        prop_assert_eq!(
            restored.predict_matrix(features.view(), Parallelism::Sequential).unwrap(),
            model.predict_matrix(features.view(), Parallelism::Sequential).unwrap()
        );
    }

    #[test]
    fn json_roundtrip_preserves_model((model, features) in arb_model()) {
        let store = ModelStore::default().with_format(ModelFormat::Json);
        let restored = ModelStore::decode(&store.encode(&model).unwrap()).unwrap();

        prop_assert_eq!(&restored, &model);
        prop_assert_eq!(
            restored.predict_matrix(features.view(), Parallelism::Sequential).unwrap(),
            model.predict_matrix(features.view(), Parallelism::Sequential).unwrap()
        );
    }

    #[test]
    fn payload_byte_flip_is_rejected((model, _) in arb_model(), position in any::<prop::sample::Index>()) {
        let mut bytes = ModelStore::default().encode(&model).unwrap();
        let idx = HEADER_SIZE + position.index(bytes.len() - HEADER_SIZE);
        bytes[idx] ^= 0x5A;
        prop_assert!(ModelStore::decode(&bytes).is_err());
    }

    #[test]
    fn extractor_and_matrix_paths_agree((model, features) in arb_model()) {
        let extractor = FeatureExtractor::new(model.schema().clone());
        let batch = model.predict_matrix(features.view(), Parallelism::Parallel).unwrap();
        for (row, expected) in features.rows().into_iter().zip(batch) {
            let mut record = appraise::HouseRecord::default();
            for (&field, &value) in model.schema().fields().iter().zip(row.iter()) {
                *field.value_mut(&mut record) = value;
            }
            let vector = extractor.extract(&record).unwrap();
            prop_assert_eq!(model.predict_vector(&vector).unwrap(), expected);
        }
    }
}
