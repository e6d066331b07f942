//! CSV record source backed by the Arrow CSV reader.
//!
//! Columns are resolved by header name through a [`ColumnMapping`], so the
//! column order in the file is irrelevant. Every mapped column is cast to
//! `Float32`; empty or unparseable cells become `NaN` (or `None` for the
//! target) and are rejected later by feature extraction unless
//! [`CsvOptions::skip_incomplete_rows`] drops them here.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, AsArray, Float32Array};
use arrow::compute::{can_cast_types, cast};
use arrow::csv::reader::Format;
use arrow::csv::{Reader, ReaderBuilder};
use arrow::datatypes::{DataType, Float32Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use super::error::DatasetLoadError;
use super::record::HouseRecord;
use crate::features::FeatureField;

// =============================================================================
// ColumnMapping
// =============================================================================

/// Header names for each feature field and the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Indexed by [`FeatureField::index`].
    features: Vec<String>,
    target: String,
}

impl ColumnMapping {
    /// Column names used by the Ames Housing dataset.
    pub fn ames() -> Self {
        let features = FeatureField::ALL
            .iter()
            .map(|field| {
                match field {
                    FeatureField::OverallQuality => "Overall Qual",
                    FeatureField::AboveGradeLivingArea => "Gr Liv Area",
                    FeatureField::GarageCarCapacity => "Garage Cars",
                    FeatureField::GarageArea => "Garage Area",
                    FeatureField::TotalBasementArea => "Total Bsmt SF",
                    FeatureField::FirstFloorArea => "1st Flr SF",
                    FeatureField::FullBathCount => "Full Bath",
                    FeatureField::YearBuilt => "Year Built",
                    FeatureField::YearRemodeled => "Year Remod/Add",
                    FeatureField::LotArea => "Lot Area",
                }
                .to_string()
            })
            .collect();
        Self {
            features,
            target: "SalePrice".to_string(),
        }
    }

    /// Mapping where every header equals the field's canonical name
    /// (`overall_quality`, ..., `sale_price`).
    pub fn canonical() -> Self {
        Self {
            features: FeatureField::ALL.iter().map(|f| f.name().to_string()).collect(),
            target: crate::features::TARGET_NAME.to_string(),
        }
    }

    /// Override the header name of one feature field.
    pub fn with_column(mut self, field: FeatureField, header: impl Into<String>) -> Self {
        self.features[field.index()] = header.into();
        self
    }

    /// Override the header name of the target column.
    pub fn with_target(mut self, header: impl Into<String>) -> Self {
        self.target = header.into();
        self
    }

    /// Header name for a feature field.
    pub fn column(&self, field: FeatureField) -> &str {
        &self.features[field.index()]
    }

    /// Header name for the target.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::ames()
    }
}

// =============================================================================
// CsvOptions
// =============================================================================

/// Options for [`CsvRecordSource`].
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub mapping: ColumnMapping,
    pub delimiter: u8,
    /// Rows per Arrow record batch.
    pub batch_size: usize,
    /// Drop rows with an empty or unparseable mapped cell instead of
    /// yielding them with `NaN` fields.
    pub skip_incomplete_rows: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            mapping: ColumnMapping::default(),
            delimiter: b',',
            batch_size: 1024,
            skip_incomplete_rows: false,
        }
    }
}

// =============================================================================
// CsvRecordSource
// =============================================================================

/// A finite, restartable source of [`HouseRecord`]s read from a CSV file.
///
/// Opening the source infers the column types and checks that every mapped
/// feature column exists. A missing target column is allowed: records then
/// carry `sale_price: None`, which suits files of houses to price.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
    options: CsvOptions,
    schema: SchemaRef,
    /// Column indices passed to the reader as a projection.
    projection: Vec<usize>,
    has_target: bool,
}

impl CsvRecordSource {
    /// Open a comma-delimited file using the Ames column names.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetLoadError> {
        Self::open_with(path, CsvOptions::default())
    }

    /// Open a file with explicit options.
    pub fn open_with(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self, DatasetLoadError> {
        let path = path.as_ref().to_path_buf();
        let file = open_file(&path)?;

        let format = Format::default()
            .with_header(true)
            .with_delimiter(options.delimiter);
        let (schema, n_rows) = format.infer_schema(file, None)?;

        let mut projection = Vec::with_capacity(FeatureField::ALL.len() + 1);
        for field in FeatureField::ALL {
            let name = options.mapping.column(field);
            let (idx, column) = schema
                .column_with_name(name)
                .ok_or_else(|| DatasetLoadError::MissingColumn(name.to_string()))?;
            check_numeric(name, column.data_type())?;
            projection.push(idx);
        }

        let has_target = match schema.column_with_name(options.mapping.target()) {
            Some((idx, column)) => {
                check_numeric(options.mapping.target(), column.data_type())?;
                projection.push(idx);
                true
            }
            None => false,
        };

        tracing::debug!(
            path = %path.display(),
            n_columns = schema.fields().len(),
            n_rows,
            has_target,
            "opened csv record source"
        );

        Ok(Self {
            path,
            options,
            schema: Arc::new(schema),
            projection,
            has_target,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has the mapped target column.
    pub fn has_target(&self) -> bool {
        self.has_target
    }

    /// Iterate over the records from the start of the file.
    ///
    /// Each call re-opens the file; batches are decoded lazily.
    pub fn records(&self) -> Result<RecordIter, DatasetLoadError> {
        let file = open_file(&self.path)?;
        let reader = ReaderBuilder::new(Arc::clone(&self.schema))
            .with_header(true)
            .with_delimiter(self.options.delimiter)
            .with_batch_size(self.options.batch_size)
            .with_projection(self.projection.clone())
            .build(file)?;

        Ok(RecordIter {
            reader,
            mapping: self.options.mapping.clone(),
            has_target: self.has_target,
            skip_incomplete_rows: self.options.skip_incomplete_rows,
            pending: Vec::new().into_iter(),
            n_rows_read: 0,
            n_yielded: 0,
            n_skipped: 0,
            finished: false,
        })
    }

    /// Read every record into memory.
    pub fn read_all(&self) -> Result<Vec<HouseRecord>, DatasetLoadError> {
        self.records()?.collect()
    }
}

fn open_file(path: &Path) -> Result<File, DatasetLoadError> {
    File::open(path).map_err(|source| DatasetLoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn check_numeric(column: &str, data_type: &DataType) -> Result<(), DatasetLoadError> {
    if can_cast_types(data_type, &DataType::Float32) {
        Ok(())
    } else {
        Err(DatasetLoadError::UnsupportedType {
            column: column.to_string(),
            got: format!("{data_type:?}"),
        })
    }
}

// =============================================================================
// RecordIter
// =============================================================================

/// Lazy iterator over the records of a [`CsvRecordSource`].
pub struct RecordIter {
    reader: Reader<File>,
    mapping: ColumnMapping,
    has_target: bool,
    skip_incomplete_rows: bool,
    pending: std::vec::IntoIter<HouseRecord>,
    n_rows_read: usize,
    n_yielded: usize,
    n_skipped: usize,
    finished: bool,
}

impl RecordIter {
    fn decode(&mut self, batch: &RecordBatch) -> Result<Vec<HouseRecord>, DatasetLoadError> {
        let mut columns = Vec::with_capacity(FeatureField::ALL.len());
        for field in FeatureField::ALL {
            columns.push(float_column(batch, self.mapping.column(field))?);
        }
        let target = if self.has_target {
            Some(float_column(batch, self.mapping.target())?)
        } else {
            None
        };

        let first_row = self.n_rows_read;
        self.n_rows_read += batch.num_rows();

        let mut records = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let mut record = HouseRecord::default();
            let mut complete = true;
            for (field, column) in FeatureField::ALL.iter().zip(&columns) {
                let value = if column.is_null(row) {
                    f32::NAN
                } else {
                    column.value(row)
                };
                complete &= !value.is_nan();
                *field.value_mut(&mut record) = value;
            }
            if let Some(target) = &target {
                record.sale_price = (!target.is_null(row)).then(|| target.value(row));
                complete &= record.sale_price.is_some_and(|p| !p.is_nan());
            }

            if !complete && self.skip_incomplete_rows {
                self.n_skipped += 1;
                tracing::debug!(row = first_row + row, "skipping incomplete row");
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl Iterator for RecordIter {
    type Item = Result<HouseRecord, DatasetLoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.next() {
                self.n_yielded += 1;
                return Some(Ok(record));
            }
            if self.finished {
                return None;
            }
            match self.reader.next() {
                Some(Ok(batch)) => match self.decode(&batch) {
                    Ok(records) => self.pending = records.into_iter(),
                    Err(e) => return Some(Err(e)),
                },
                Some(Err(e)) => return Some(Err(e.into())),
                None => {
                    self.finished = true;
                    if self.n_skipped > 0 {
                        tracing::warn!(
                            n_records = self.n_yielded,
                            n_skipped = self.n_skipped,
                            "skipped incomplete rows"
                        );
                    } else {
                        tracing::debug!(n_records = self.n_yielded, "finished reading records");
                    }
                }
            }
        }
    }
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Float32Array, DatasetLoadError> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| DatasetLoadError::MissingColumn(name.to_string()))?;
    let casted = cast(column, &DataType::Float32)?;
    Ok(casted.as_primitive::<Float32Type>().clone())
}
