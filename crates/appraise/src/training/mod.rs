//! Training infrastructure for gradient boosting.
//!
//! ## Shared Infrastructure
//!
//! - [`Gradients`]: SoA gradient storage
//! - [`ObjectiveFn`], [`SquaredLoss`]: the loss being minimized
//! - [`TrainingLogger`], [`Verbosity`]: structured logging
//!
//! ## Tree Training
//!
//! - [`GBDTTrainer`] / [`GBDTParams`]: boosting loop
//! - [`TreeGrower`], [`GrowthStrategy`]: histogram-based tree growth
//! - [`BinnedMatrix`]: quantile-binned training features
//!
//! ## Metrics
//!
//! - [`Rmse`], [`Mse`], [`Mae`], [`RSquared`]
//! - [`RegressionMetrics`]: evaluation summary

mod binning;
mod gradients;
mod grower;
mod histogram;
mod logger;
mod metrics;
mod objective;
mod partition;
mod split;
mod trainer;

pub use binning::{BinCuts, BinnedMatrix, MAX_BINS};
pub use gradients::Gradients;
pub use grower::{GrowerParams, GrowthStrategy, TreeGrower};
pub use histogram::{GradStats, NodeHistogram};
pub use logger::{TrainingLogger, Verbosity};
pub use metrics::{Mae, MetricFn, Mse, RSquared, RegressionMetrics, Rmse};
pub use objective::{ObjectiveFn, SquaredLoss};
pub use partition::RowPartitioner;
pub use split::{GainParams, SplitInfo, find_best_split};
pub use trainer::{GBDTParams, GBDTTrainer};
