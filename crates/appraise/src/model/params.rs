//! Nested parameter groups for [`PriceModelConfig`](super::PriceModelConfig).
//!
//! Parameters are grouped by concern:
//! - [`TreeParams`]: tree size, growth pattern, histogram resolution
//! - [`RegularizationParams`]: L2 penalty and split constraints
//! - [`SamplingParams`]: row subsampling
//!
//! Defaults follow a FastTree-style regressor: leaf-wise trees of 20 leaves,
//! at least 10 rows per leaf, 255 bins per feature.

use serde::{Deserialize, Serialize};

use crate::training::{GainParams, GrowthStrategy, MAX_BINS};

/// Validation failures of a single parameter group.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValidationError {
    InvalidLambda(f32),
    InvalidMinChildWeight(f32),
    InvalidMinGain(f32),
    InvalidSubsample(f32),
    InvalidMaxDepth(u32),
    InvalidMaxLeaves(u32),
    InvalidMaxBins(usize),
}

// =============================================================================
// TreeParams
// =============================================================================

/// Tree structure parameters.
///
/// ```
/// use appraise::model::TreeParams;
///
/// let params = TreeParams::depth_wise(6);
/// assert_eq!(params.max_depth(), Some(6));
///
/// let params = TreeParams::leaf_wise(31).with_max_bins(64);
/// assert_eq!(params.max_leaves(), Some(31));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    pub growth_strategy: GrowthStrategy,
    /// Maximum histogram bins per feature, in `2..=256`. Default: 255.
    pub max_bins: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            growth_strategy: GrowthStrategy::default(),
            max_bins: 255,
        }
    }
}

impl TreeParams {
    pub fn depth_wise(max_depth: u32) -> Self {
        Self {
            growth_strategy: GrowthStrategy::DepthWise { max_depth },
            ..Default::default()
        }
    }

    pub fn leaf_wise(max_leaves: u32) -> Self {
        Self {
            growth_strategy: GrowthStrategy::LeafWise { max_leaves },
            ..Default::default()
        }
    }

    pub fn with_max_bins(mut self, max_bins: usize) -> Self {
        self.max_bins = max_bins;
        self
    }

    pub fn max_depth(&self) -> Option<u32> {
        match self.growth_strategy {
            GrowthStrategy::DepthWise { max_depth } => Some(max_depth),
            GrowthStrategy::LeafWise { .. } => None,
        }
    }

    pub fn max_leaves(&self) -> Option<u32> {
        match self.growth_strategy {
            GrowthStrategy::DepthWise { .. } => None,
            GrowthStrategy::LeafWise { max_leaves } => Some(max_leaves),
        }
    }

    pub fn validate(&self) -> Result<(), ParamValidationError> {
        match self.growth_strategy {
            GrowthStrategy::DepthWise { max_depth } if max_depth == 0 => {
                return Err(ParamValidationError::InvalidMaxDepth(max_depth));
            }
            GrowthStrategy::LeafWise { max_leaves } if max_leaves < 2 => {
                return Err(ParamValidationError::InvalidMaxLeaves(max_leaves));
            }
            _ => {}
        }
        if !(2..=MAX_BINS).contains(&self.max_bins) {
            return Err(ParamValidationError::InvalidMaxBins(self.max_bins));
        }
        Ok(())
    }
}

// =============================================================================
// RegularizationParams
// =============================================================================

/// Regularization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizationParams {
    /// L2 regularization term on leaf weights. Default: 1.0.
    pub lambda: f32,

    /// Minimum sum of hessians required in a leaf. Default: 1.0.
    ///
    /// With squared loss every row has hessian 1, so this is a row count.
    pub min_child_weight: f32,

    /// Minimum gain required to make a split. Default: 0.0.
    pub min_gain: f32,

    /// Minimum number of rows required in a leaf. Default: 10.
    pub min_samples_leaf: u32,
}

impl Default for RegularizationParams {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            min_child_weight: 1.0,
            min_gain: 0.0,
            min_samples_leaf: 10,
        }
    }
}

impl RegularizationParams {
    pub fn validate(&self) -> Result<(), ParamValidationError> {
        if !(self.lambda >= 0.0) {
            return Err(ParamValidationError::InvalidLambda(self.lambda));
        }
        if !(self.min_child_weight >= 0.0) {
            return Err(ParamValidationError::InvalidMinChildWeight(self.min_child_weight));
        }
        if !(self.min_gain >= 0.0) {
            return Err(ParamValidationError::InvalidMinGain(self.min_gain));
        }
        Ok(())
    }

    pub(crate) fn to_gain_params(&self) -> GainParams {
        GainParams {
            reg_lambda: self.lambda,
            min_gain: self.min_gain,
            min_child_weight: self.min_child_weight,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

// =============================================================================
// SamplingParams
// =============================================================================

/// Row sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Fraction of rows used for each tree, in `(0, 1]`. Default: 1.0.
    pub subsample: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self { subsample: 1.0 }
    }
}

impl SamplingParams {
    pub fn validate(&self) -> Result<(), ParamValidationError> {
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ParamValidationError::InvalidSubsample(self.subsample));
        }
        Ok(())
    }
}
