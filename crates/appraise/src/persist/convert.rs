//! Conversion between runtime types and schema types.
//!
//! Runtime → schema conversions are infallible `From` impls. Schema →
//! runtime conversions are `TryFrom` impls that validate everything a
//! corrupt or hand-edited file could get wrong: array lengths, child
//! indices, reachability, finite values and feature-count agreement.

use super::native::DeserializeError;
use super::schema::{
    FeatureSchemaSchema, ForestSchema, MetricsSchema, MinMaxSchema, ModelMetaSchema, NormalizationSchema,
    PriceModelSchema, TreeSchema,
};
use crate::features::FeatureSchema;
use crate::model::{ModelMeta, PriceModel};
use crate::normalize::{MinMaxScaler, Normalization};
use crate::repr::{Forest, Tree};
use crate::training::RegressionMetrics;

fn corrupt(msg: impl Into<String>) -> DeserializeError {
    DeserializeError::CorruptPayload(msg.into())
}

// =============================================================================
// Small value conversions
// =============================================================================

impl From<Normalization> for NormalizationSchema {
    fn from(n: Normalization) -> Self {
        match n {
            Normalization::None => Self::None,
            Normalization::MinMax => Self::MinMax,
        }
    }
}

impl From<NormalizationSchema> for Normalization {
    fn from(n: NormalizationSchema) -> Self {
        match n {
            NormalizationSchema::None => Self::None,
            NormalizationSchema::MinMax => Self::MinMax,
        }
    }
}

impl From<&RegressionMetrics> for MetricsSchema {
    fn from(m: &RegressionMetrics) -> Self {
        Self {
            r_squared: m.r_squared,
            rmse: m.rmse,
            mse: m.mse,
            mae: m.mae,
            n_samples: m.n_samples as u64,
        }
    }
}

impl From<MetricsSchema> for RegressionMetrics {
    fn from(m: MetricsSchema) -> Self {
        Self {
            r_squared: m.r_squared,
            rmse: m.rmse,
            mse: m.mse,
            mae: m.mae,
            n_samples: m.n_samples as usize,
        }
    }
}

// =============================================================================
// FeatureSchema
// =============================================================================

impl From<&FeatureSchema> for FeatureSchemaSchema {
    fn from(schema: &FeatureSchema) -> Self {
        Self {
            names: schema.feature_names(),
            target: schema.target().to_string(),
        }
    }
}

impl TryFrom<FeatureSchemaSchema> for FeatureSchema {
    type Error = DeserializeError;

    fn try_from(schema: FeatureSchemaSchema) -> Result<Self, Self::Error> {
        if schema.target.is_empty() {
            return Err(corrupt("empty target name"));
        }
        FeatureSchema::from_names(&schema.names, schema.target)
            .ok_or_else(|| corrupt(format!("unknown feature in [{}]", schema.names.join(", "))))
    }
}

// =============================================================================
// Tree / Forest
// =============================================================================

impl From<&Tree> for TreeSchema {
    fn from(tree: &Tree) -> Self {
        Self {
            num_nodes: tree.n_nodes() as u32,
            split_features: tree.split_indices().to_vec(),
            thresholds: tree.split_thresholds().to_vec(),
            left_children: tree.left_children().to_vec(),
            right_children: tree.right_children().to_vec(),
            is_leaf: tree.leaf_flags().to_vec(),
            leaf_values: tree.leaf_values().to_vec(),
        }
    }
}

impl TryFrom<TreeSchema> for Tree {
    type Error = DeserializeError;

    fn try_from(schema: TreeSchema) -> Result<Self, Self::Error> {
        let n = schema.num_nodes as usize;
        let lengths = [
            schema.split_features.len(),
            schema.thresholds.len(),
            schema.left_children.len(),
            schema.right_children.len(),
            schema.is_leaf.len(),
            schema.leaf_values.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(corrupt(format!("tree arrays {lengths:?} disagree with num_nodes {n}")));
        }

        let tree = Tree::from_parts(
            schema.split_features,
            schema.thresholds,
            schema.left_children,
            schema.right_children,
            schema.is_leaf,
            schema.leaf_values,
        );
        tree.validate().map_err(|e| corrupt(e.to_string()))?;
        Ok(tree)
    }
}

impl From<&Forest> for ForestSchema {
    fn from(forest: &Forest) -> Self {
        Self {
            num_features: forest.n_features() as u32,
            base_score: forest.base_score(),
            trees: forest.trees().map(TreeSchema::from).collect(),
        }
    }
}

impl TryFrom<ForestSchema> for Forest {
    type Error = DeserializeError;

    fn try_from(schema: ForestSchema) -> Result<Self, Self::Error> {
        let mut forest = Forest::new(schema.num_features as usize).with_base_score(schema.base_score);
        for (idx, tree) in schema.trees.into_iter().enumerate() {
            let tree = Tree::try_from(tree).map_err(|e| match e {
                DeserializeError::CorruptPayload(msg) => corrupt(format!("tree {idx}: {msg}")),
                other => other,
            })?;
            forest.push_tree(tree);
        }
        forest.validate().map_err(|e| corrupt(e.to_string()))?;
        Ok(forest)
    }
}

// =============================================================================
// PriceModel
// =============================================================================

impl From<&PriceModel> for PriceModelSchema {
    fn from(model: &PriceModel) -> Self {
        let meta = model.meta();
        Self {
            features: model.schema().into(),
            forest: model.forest().into(),
            normalizer: model.scaler().map(|s| MinMaxSchema {
                mins: s.mins().to_vec(),
                maxs: s.maxs().to_vec(),
            }),
            meta: ModelMetaSchema {
                n_train_rows: meta.n_train_rows as u64,
                normalization: meta.normalization.into(),
                seed: meta.seed,
                train_metrics: meta.train_metrics.as_ref().map(MetricsSchema::from),
                crate_version: meta.crate_version.clone(),
            },
        }
    }
}

impl TryFrom<PriceModelSchema> for PriceModel {
    type Error = DeserializeError;

    fn try_from(schema: PriceModelSchema) -> Result<Self, Self::Error> {
        let features = FeatureSchema::try_from(schema.features)?;
        let n_features = features.n_features();
        if schema.forest.num_features as usize != n_features {
            return Err(corrupt(format!(
                "forest expects {} features, schema lists {n_features}",
                schema.forest.num_features
            )));
        }
        let forest = Forest::try_from(schema.forest)?;

        let normalization = Normalization::from(schema.meta.normalization);
        let scaler = match (normalization, schema.normalizer) {
            (Normalization::None, None) => None,
            (Normalization::MinMax, Some(mm)) => {
                if mm.mins.iter().chain(&mm.maxs).any(|v| !v.is_finite()) {
                    return Err(corrupt("normalizer has non-finite bounds"));
                }
                let scaler = MinMaxScaler::from_parts(mm.mins, mm.maxs)
                    .ok_or_else(|| corrupt("normalizer mins and maxs differ in length"))?;
                if scaler.n_features() != n_features {
                    return Err(corrupt(format!(
                        "normalizer covers {} features, schema lists {n_features}",
                        scaler.n_features()
                    )));
                }
                Some(scaler)
            }
            (normalization, normalizer) => {
                return Err(corrupt(format!(
                    "normalization {normalization:?} with normalizer present = {}",
                    normalizer.is_some()
                )));
            }
        };

        let mut meta = ModelMeta::for_training(n_features, schema.meta.n_train_rows as usize)
            .with_base_score(forest.base_score())
            .with_normalization(normalization)
            .with_seed(schema.meta.seed);
        meta.crate_version = schema.meta.crate_version;
        if let Some(metrics) = schema.meta.train_metrics {
            meta = meta.with_train_metrics(metrics.into());
        }

        Ok(PriceModel::from_parts(forest, features, scaler, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureField;
    use crate::repr::MutableTree;

    fn split_tree() -> Tree {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        let (l, r) = tree.apply_numeric_split(root, 1, 1500.0);
        tree.make_leaf(l, -10.0);
        tree.make_leaf(r, 10.0);
        tree.freeze()
    }

    fn model(scaler: Option<MinMaxScaler>) -> PriceModel {
        let schema = FeatureSchema::new(vec![FeatureField::OverallQuality, FeatureField::AboveGradeLivingArea]);
        let mut forest = Forest::new(2).with_base_score(100.0);
        forest.push_tree(split_tree());
        let normalization = if scaler.is_some() {
            Normalization::MinMax
        } else {
            Normalization::None
        };
        let meta = ModelMeta::for_training(2, 10)
            .with_base_score(100.0)
            .with_normalization(normalization);
        PriceModel::from_parts(forest, schema, scaler, meta)
    }

    #[test]
    fn model_roundtrip_through_schema() {
        for scaler in [None, MinMaxScaler::from_parts(vec![1.0, 500.0], vec![10.0, 4000.0])] {
            let original = model(scaler);
            let schema = PriceModelSchema::from(&original);
            let restored = PriceModel::try_from(schema).unwrap();
            assert_eq!(restored, original);
        }
    }

    #[test]
    fn tree_length_mismatch_is_corrupt() {
        let mut schema = TreeSchema::from(&split_tree());
        schema.leaf_values.pop();
        assert!(matches!(Tree::try_from(schema), Err(DeserializeError::CorruptPayload(_))));
    }

    #[test]
    fn dangling_child_is_corrupt() {
        let mut schema = TreeSchema::from(&split_tree());
        schema.right_children[0] = 7;
        assert!(matches!(Tree::try_from(schema), Err(DeserializeError::CorruptPayload(_))));
    }

    #[test]
    fn bad_tree_in_forest_names_its_index_once() {
        let mut schema = PriceModelSchema::from(&model(None));
        schema.forest.trees[0].right_children[0] = 7;
        let message = Forest::try_from(schema.forest).unwrap_err().to_string();
        assert!(message.starts_with("corrupt payload: tree 0: "), "{message}");
        assert_eq!(message.matches("corrupt payload").count(), 1);
    }

    #[test]
    fn feature_count_disagreement_is_corrupt() {
        let mut schema = PriceModelSchema::from(&model(None));
        schema.forest.num_features = 3;
        assert!(matches!(
            PriceModel::try_from(schema),
            Err(DeserializeError::CorruptPayload(_))
        ));

        let mut schema = PriceModelSchema::from(&model(None));
        schema.features.names.push("not_a_field".into());
        assert!(matches!(
            PriceModel::try_from(schema),
            Err(DeserializeError::CorruptPayload(_))
        ));
    }

    #[test]
    fn normalizer_must_match_flag() {
        let mut schema = PriceModelSchema::from(&model(None));
        schema.meta.normalization = NormalizationSchema::MinMax;
        assert!(PriceModel::try_from(schema).is_err());

        let schema = PriceModelSchema::from(&model(MinMaxScaler::from_parts(vec![0.0], vec![1.0])));
        assert!(PriceModel::try_from(schema).is_err());
    }
}
