//! Training progress logging.
//!
//! [`TrainingLogger`] turns training milestones into `tracing` events, gated
//! by the configured [`Verbosity`]. Installing a subscriber is left to the
//! application.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// How much the trainer reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// No events.
    #[default]
    Silent,
    /// Only warnings (e.g. degenerate training data).
    Warning,
    /// Start and finish summaries.
    Info,
    /// Per-round metrics.
    Debug,
}

/// Emits training events according to a [`Verbosity`].
#[derive(Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    started: Option<Instant>,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            started: None,
        }
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level && level != Verbosity::Silent
    }

    pub fn start_training(&mut self, n_trees: usize, n_rows: usize, n_features: usize) {
        self.started = Some(Instant::now());
        if self.enabled(Verbosity::Info) {
            tracing::info!(n_trees, n_rows, n_features, "training started");
        }
    }

    pub fn log_round(&self, round: usize, metric: &str, value: f64) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(round, metric, value, "boosting round");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(Verbosity::Warning) {
            tracing::warn!("{message}");
        }
    }

    pub fn finish_training(&self, n_trees: usize, metric: &str, value: f64) {
        if self.enabled(Verbosity::Info) {
            let elapsed_ms = self.started.map(|s| s.elapsed().as_millis() as u64).unwrap_or(0);
            tracing::info!(n_trees, metric, value, elapsed_ms, "training finished");
        }
    }
}
