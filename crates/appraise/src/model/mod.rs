//! Trained model types and their configuration.
//!
//! - [`PriceModelConfig`]: validated training configuration
//! - [`TreeParams`], [`RegularizationParams`], [`SamplingParams`]: nested groups
//! - [`PriceModel`]: immutable trained model
//! - [`ModelMeta`]: training context stored with the model

mod config;
mod meta;
mod params;
mod price_model;

pub use config::{ConfigError, PriceModelConfig};
pub use meta::ModelMeta;
pub use params::{ParamValidationError, RegularizationParams, SamplingParams, TreeParams};
pub use price_model::PriceModel;
