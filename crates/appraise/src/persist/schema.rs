//! Schema types for model serialization.
//!
//! These types give the persisted format a shape independent of the runtime
//! types, so the two can evolve separately and every loaded value passes
//! through validation before it becomes a [`PriceModel`](crate::PriceModel).
//!
//! The same types back both the binary payload (Postcard, not
//! self-describing) and the JSON rendition, so no field may be skipped
//! conditionally.

use serde::{Deserialize, Serialize};

/// Version-tagged binary payload.
///
/// New format versions add variants rather than modifying existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    V1(PriceModelSchema),
}

/// JSON document wrapping a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEnvelope {
    /// Always [`JsonEnvelope::FORMAT`].
    pub format: String,
    pub version: u8,
    pub model: PriceModelSchema,
}

impl JsonEnvelope {
    pub const FORMAT: &'static str = "appraise";
}

/// Full price model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModelSchema {
    pub features: FeatureSchemaSchema,
    pub forest: ForestSchema,
    pub normalizer: Option<MinMaxSchema>,
    pub meta: ModelMetaSchema,
}

/// Feature layout: canonical field names in order, plus the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchemaSchema {
    pub names: Vec<String>,
    pub target: String,
}

/// Forest of trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSchema {
    pub num_features: u32,
    pub base_score: f32,
    pub trees: Vec<TreeSchema>,
}

/// Single tree in SoA layout, one entry per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSchema {
    pub num_nodes: u32,
    pub split_features: Vec<u32>,
    /// Rows with `value < threshold` go left.
    pub thresholds: Vec<f32>,
    pub left_children: Vec<u32>,
    pub right_children: Vec<u32>,
    pub is_leaf: Vec<bool>,
    pub leaf_values: Vec<f32>,
}

/// Fitted min-max normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxSchema {
    pub mins: Vec<f32>,
    pub maxs: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationSchema {
    None,
    MinMax,
}

/// Fit summary on the training set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSchema {
    pub r_squared: f64,
    pub rmse: f64,
    pub mse: f64,
    pub mae: f64,
    pub n_samples: u64,
}

/// Training context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetaSchema {
    pub n_train_rows: u64,
    pub normalization: NormalizationSchema,
    pub seed: u64,
    pub train_metrics: Option<MetricsSchema>,
    pub crate_version: String,
}
