//! appraise: house sale price regression with gradient boosted trees.
//!
//! Turns tabular real-estate records into a fixed-order feature vector,
//! fits a histogram-based boosted tree ensemble on squared error, scores
//! the fit, predicts prices for new houses, and persists the trained model
//! together with the feature schema it was trained on.
//!
//! # Key Types
//!
//! - [`HouseRecord`] / [`Prediction`] - Input row and model output
//! - [`FeatureExtractor`] / [`FeatureSchema`] - The single record-to-vector path
//! - [`PriceModelConfig`] - Configuration builder
//! - [`Session`] - Explicit pipeline context: fit, evaluate, predict
//! - [`PriceModel`] - Immutable trained model
//! - [`ModelStore`] - Save and load models
//!
//! # Example
//!
//! ```no_run
//! use appraise::{HouseRecord, ModelStore, PriceModelConfig, Session};
//!
//! # fn main() -> appraise::Result<()> {
//! let records: Vec<HouseRecord> = appraise::data::CsvRecordSource::open("AmesHousing.csv")?
//!     .records()?
//!     .collect::<Result<_, _>>()?;
//!
//! let session = Session::new(PriceModelConfig::builder().n_trees(200).build()?);
//! let model = session.fit(&records)?;
//! let metrics = session.evaluate(&model, &records)?;
//! println!("R^2 = {:.4}", metrics.r_squared);
//!
//! ModelStore::default().save(&model, "model.aprs")?;
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod features;
pub mod inference;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{Error, FieldDefect, Result};

pub use data::{HouseRecord, Prediction};
pub use features::{FeatureExtractor, FeatureField, FeatureSchema, FeatureVector, extract};
pub use normalize::Normalization;

pub use model::{ConfigError, ModelMeta, PriceModel, PriceModelConfig};
pub use pipeline::Session;
pub use training::RegressionMetrics;

pub use persist::{ModelFormat, ModelStore, RetryPolicy};

pub use utils::{Parallelism, run_with_threads};
