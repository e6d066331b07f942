//! Price model configuration with builder pattern.
//!
//! [`PriceModelConfig`] composes nested parameter groups and uses the `bon`
//! crate for builder generation with validation at `build()`. The same type
//! can be read from JSON, where omitted fields take their defaults.
//!
//! # Example
//!
//! ```
//! use appraise::model::{PriceModelConfig, SamplingParams, TreeParams};
//! use appraise::Normalization;
//!
//! // All defaults
//! let config = PriceModelConfig::builder().build().unwrap();
//!
//! let config = PriceModelConfig::builder()
//!     .n_trees(200)
//!     .learning_rate(0.1)
//!     .tree(TreeParams::depth_wise(6))
//!     .sampling(SamplingParams { subsample: 0.8 })
//!     .normalization(Normalization::MinMax)
//!     .build()
//!     .unwrap();
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::{ParamValidationError, RegularizationParams, SamplingParams, TreeParams};
use crate::normalize::Normalization;
use crate::training::{GBDTParams, Verbosity};

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Learning rate must be positive and finite.
    InvalidLearningRate(f32),
    /// Number of trees must be at least 1.
    InvalidNTrees,
    /// Invalid sampling ratio (must be in (0, 1]).
    InvalidSamplingRatio { field: &'static str, value: f32 },
    /// Invalid regularization parameter.
    InvalidRegularization { field: &'static str, value: f32 },
    /// `max_depth` must be at least 1, `max_leaves` at least 2.
    InvalidTreeSize { field: &'static str, value: u32 },
    /// `max_bins` must be in `2..=256`.
    InvalidMaxBins(usize),
    /// The configuration document could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLearningRate(v) => {
                write!(f, "learning_rate must be positive, got {}", v)
            }
            Self::InvalidNTrees => write!(f, "n_trees must be at least 1"),
            Self::InvalidSamplingRatio { field, value } => {
                write!(f, "{} must be in (0, 1], got {}", field, value)
            }
            Self::InvalidRegularization { field, value } => {
                write!(f, "{} must be non-negative, got {}", field, value)
            }
            Self::InvalidTreeSize { field, value } => {
                write!(f, "{} is too small, got {}", field, value)
            }
            Self::InvalidMaxBins(v) => write!(f, "max_bins must be in 2..=256, got {}", v),
            Self::Parse(msg) => write!(f, "failed to parse configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// PriceModelConfig
// =============================================================================

/// Configuration for training a [`PriceModel`](super::PriceModel).
///
/// # Structure
///
/// - **Boosting**: `n_trees` and `learning_rate`
/// - **Tree**: growth strategy and binning via [`TreeParams`]
/// - **Regularization**: overfitting control via [`RegularizationParams`]
/// - **Sampling**: row subsampling via [`SamplingParams`]
/// - **Preprocessing**: opt-in feature [`Normalization`]
/// - **Resources**: threading
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
#[serde(default)]
pub struct PriceModelConfig {
    // === Boosting parameters ===
    /// Number of boosting rounds (trees to train). Default: 100.
    #[builder(default = 100)]
    pub n_trees: u32,

    /// Learning rate (shrinkage). Default: 0.2.
    #[builder(default = 0.2)]
    pub learning_rate: f32,

    // === Nested parameter groups ===
    /// Tree structure parameters.
    #[builder(default)]
    pub tree: TreeParams,

    /// Regularization parameters.
    #[builder(default)]
    pub regularization: RegularizationParams,

    /// Row sampling parameters.
    #[builder(default)]
    pub sampling: SamplingParams,

    // === Preprocessing ===
    /// Feature normalization. Default: none.
    #[builder(default)]
    pub normalization: Normalization,

    // === Resource control ===
    /// Number of threads. `None` uses all available cores.
    pub n_threads: Option<NonZeroUsize>,

    // === Reproducibility ===
    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    // === Logging ===
    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: price_model_config_builder::IsComplete> PriceModelConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `learning_rate <= 0` or not finite
    /// - `n_trees == 0`
    /// - tree size or `max_bins` out of range
    /// - `subsample` outside (0, 1]
    /// - negative regularization parameters
    pub fn build(self) -> Result<PriceModelConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl PriceModelConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&json)?)
    }

    /// Thread count in [`run_with_threads`](crate::run_with_threads) terms
    /// (0 = all cores).
    pub fn thread_count(&self) -> usize {
        self.n_threads.map_or(0, NonZeroUsize::get)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }

        if self.n_trees == 0 {
            return Err(ConfigError::InvalidNTrees);
        }

        self.tree.validate().map_err(Self::convert_param_error)?;
        self.sampling.validate().map_err(Self::convert_param_error)?;
        self.regularization
            .validate()
            .map_err(Self::convert_param_error)?;

        Ok(())
    }

    /// Convert to the low-level trainer parameters.
    pub(crate) fn to_gbdt_params(&self) -> GBDTParams {
        GBDTParams {
            n_trees: self.n_trees,
            learning_rate: self.learning_rate,
            growth_strategy: self.tree.growth_strategy,
            max_bins: self.tree.max_bins,
            gain: self.regularization.to_gain_params(),
            subsample: self.sampling.subsample,
            verbosity: self.verbosity,
            seed: self.seed,
        }
    }

    fn convert_param_error(e: ParamValidationError) -> ConfigError {
        match e {
            ParamValidationError::InvalidLambda(v) => ConfigError::InvalidRegularization {
                field: "lambda",
                value: v,
            },
            ParamValidationError::InvalidMinChildWeight(v) => ConfigError::InvalidRegularization {
                field: "min_child_weight",
                value: v,
            },
            ParamValidationError::InvalidMinGain(v) => ConfigError::InvalidRegularization {
                field: "min_gain",
                value: v,
            },
            ParamValidationError::InvalidSubsample(v) => ConfigError::InvalidSamplingRatio {
                field: "subsample",
                value: v,
            },
            ParamValidationError::InvalidMaxDepth(v) => ConfigError::InvalidTreeSize {
                field: "max_depth",
                value: v,
            },
            ParamValidationError::InvalidMaxLeaves(v) => ConfigError::InvalidTreeSize {
                field: "max_leaves",
                value: v,
            },
            ParamValidationError::InvalidMaxBins(v) => ConfigError::InvalidMaxBins(v),
        }
    }
}

impl Default for PriceModelConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

// =============================================================================
// Tests
// =============================================================================
