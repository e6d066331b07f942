//! Error type for the data source.

use std::io;
use std::path::PathBuf;

/// Errors that can occur when reading records from a file.
#[derive(Debug, thiserror::Error)]
pub enum DatasetLoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("unsupported column type for {column}: expected a numeric type, got {got}")]
    UnsupportedType { column: String, got: String },
}
