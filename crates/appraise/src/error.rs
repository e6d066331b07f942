//! Crate-level error type.
//!
//! Every public pipeline operation returns [`Result`]. Lower layers keep their
//! own error enums ([`ConfigError`], [`DatasetLoadError`],
//! [`DeserializeError`](crate::persist::DeserializeError)) and convert into
//! [`Error`] at the public boundary.

use std::fmt;

use thiserror::Error;

use crate::data::DatasetLoadError;
use crate::model::ConfigError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What is wrong with a single record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefect {
    /// Field absent (or NaN, which is how the loader marks an empty cell).
    Missing,
    /// Field is infinite.
    NonFinite,
    /// Field is below zero.
    Negative,
}

impl fmt::Display for FieldDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::NonFinite => f.write_str("not finite"),
            Self::Negative => f.write_str("negative"),
        }
    }
}

/// Errors produced by the training, evaluation, prediction and storage paths.
#[derive(Debug, Error)]
pub enum Error {
    /// Not enough records to train or evaluate.
    #[error("insufficient data: {0}")]
    InsufficientData(&'static str),

    /// A record field is missing, non-finite or negative, or the target is absent.
    #[error("invalid record{}: field `{field}` is {defect}", row_suffix(.row))]
    InvalidRecord {
        /// Position of the record in the input slice, when known.
        row: Option<usize>,
        field: String,
        defect: FieldDefect,
    },

    /// The extractor's feature layout does not agree with the model's.
    #[error("invalid schema: model expects [{}], got [{}]", .expected.join(", "), .found.join(", "))]
    InvalidSchema {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A persisted model was trained on a different feature schema than requested.
    #[error("schema mismatch: expected [{}], stored model has [{}]", .expected.join(", "), .found.join(", "))]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A persisted model could not be decoded or failed validation.
    #[error("corrupt model: {0}")]
    CorruptModel(String),

    /// Storage failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Data source failure.
    #[error(transparent)]
    Load(#[from] DatasetLoadError),
}

impl Error {
    pub(crate) fn invalid_record(row: Option<usize>, field: &str, defect: FieldDefect) -> Self {
        Self::InvalidRecord {
            row,
            field: field.to_string(),
            defect,
        }
    }
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(r) => format!(" at row {r}"),
        None => String::new(),
    }
}
