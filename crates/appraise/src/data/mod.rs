//! Input records and the CSV data source.
//!
//! [`HouseRecord`] is the typed shape of one row; [`CsvRecordSource`] reads
//! rows from a delimited file with a header, resolving columns by name.

mod error;
mod loader;
mod record;

pub use error::DatasetLoadError;
pub use loader::{ColumnMapping, CsvOptions, CsvRecordSource, RecordIter};
pub use record::{HouseRecord, Prediction};
