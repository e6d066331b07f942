//! Record-to-vector feature extraction.
//!
//! [`FeatureExtractor`] is the only path from a [`HouseRecord`] to model
//! input. Training, evaluation and prediction all go through the same
//! extractor, and the [`FeatureSchema`] it was built from is stored with the
//! trained model so any drift in field order or arity is detected.
//!
//! The standard layout is:
//!
//! | index | field |
//! |-------|-------|
//! | 0 | `overall_quality` |
//! | 1 | `above_grade_living_area` |
//! | 2 | `garage_car_capacity` |
//! | 3 | `garage_area` |
//! | 4 | `total_basement_area` |
//! | 5 | `first_floor_area` |
//! | 6 | `full_bath_count` |
//! | 7 | `year_built` |
//! | 8 | `year_remodeled` |
//! | 9 | `lot_area` |

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::HouseRecord;
use crate::error::{Error, FieldDefect, Result};
use crate::utils::Parallelism;

/// Name of the regression target.
pub const TARGET_NAME: &str = "sale_price";

// =============================================================================
// FeatureField
// =============================================================================

/// A numeric field of [`HouseRecord`] usable as a model feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureField {
    OverallQuality,
    AboveGradeLivingArea,
    GarageCarCapacity,
    GarageArea,
    TotalBasementArea,
    FirstFloorArea,
    FullBathCount,
    YearBuilt,
    YearRemodeled,
    LotArea,
}

impl FeatureField {
    /// All fields in the standard feature order.
    pub const ALL: [FeatureField; 10] = [
        FeatureField::OverallQuality,
        FeatureField::AboveGradeLivingArea,
        FeatureField::GarageCarCapacity,
        FeatureField::GarageArea,
        FeatureField::TotalBasementArea,
        FeatureField::FirstFloorArea,
        FeatureField::FullBathCount,
        FeatureField::YearBuilt,
        FeatureField::YearRemodeled,
        FeatureField::LotArea,
    ];

    /// Position in the standard order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::OverallQuality => "overall_quality",
            Self::AboveGradeLivingArea => "above_grade_living_area",
            Self::GarageCarCapacity => "garage_car_capacity",
            Self::GarageArea => "garage_area",
            Self::TotalBasementArea => "total_basement_area",
            Self::FirstFloorArea => "first_floor_area",
            Self::FullBathCount => "full_bath_count",
            Self::YearBuilt => "year_built",
            Self::YearRemodeled => "year_remodeled",
            Self::LotArea => "lot_area",
        }
    }

    /// Look a field up by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Read this field from a record.
    #[inline]
    pub fn value(self, record: &HouseRecord) -> f32 {
        match self {
            Self::OverallQuality => record.overall_quality,
            Self::AboveGradeLivingArea => record.above_grade_living_area,
            Self::GarageCarCapacity => record.garage_car_capacity,
            Self::GarageArea => record.garage_area,
            Self::TotalBasementArea => record.total_basement_area,
            Self::FirstFloorArea => record.first_floor_area,
            Self::FullBathCount => record.full_bath_count,
            Self::YearBuilt => record.year_built,
            Self::YearRemodeled => record.year_remodeled,
            Self::LotArea => record.lot_area,
        }
    }

    /// Mutable access to this field of a record.
    pub fn value_mut(self, record: &mut HouseRecord) -> &mut f32 {
        match self {
            Self::OverallQuality => &mut record.overall_quality,
            Self::AboveGradeLivingArea => &mut record.above_grade_living_area,
            Self::GarageCarCapacity => &mut record.garage_car_capacity,
            Self::GarageArea => &mut record.garage_area,
            Self::TotalBasementArea => &mut record.total_basement_area,
            Self::FirstFloorArea => &mut record.first_floor_area,
            Self::FullBathCount => &mut record.full_bath_count,
            Self::YearBuilt => &mut record.year_built,
            Self::YearRemodeled => &mut record.year_remodeled,
            Self::LotArea => &mut record.lot_area,
        }
    }
}

impl fmt::Display for FeatureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// FeatureSchema
// =============================================================================

/// Ordered feature fields plus the target name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    fields: Vec<FeatureField>,
    target: String,
}

impl FeatureSchema {
    /// The standard 10-field layout.
    pub fn standard() -> Self {
        Self::new(FeatureField::ALL.to_vec())
    }

    /// A custom layout predicting [`TARGET_NAME`].
    pub fn new(fields: Vec<FeatureField>) -> Self {
        Self {
            fields,
            target: TARGET_NAME.to_string(),
        }
    }

    /// Build a schema from canonical field names.
    ///
    /// Returns `None` if any name is unknown.
    pub fn from_names<S: AsRef<str>>(names: &[S], target: impl Into<String>) -> Option<Self> {
        let fields = names
            .iter()
            .map(|n| FeatureField::from_name(n.as_ref()))
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            fields,
            target: target.into(),
        })
    }

    #[inline]
    pub fn fields(&self) -> &[FeatureField] {
        &self.fields
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.fields.len()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_string()).collect()
    }

    /// Fails with [`Error::InvalidSchema`] unless `other` has the same fields
    /// in the same order. `self` is the side the model was trained with.
    pub fn ensure_same_layout(&self, other: &FeatureSchema) -> Result<()> {
        if self.fields == other.fields {
            Ok(())
        } else {
            Err(Error::InvalidSchema {
                expected: self.feature_names(),
                found: other.feature_names(),
            })
        }
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// FeatureVector
// =============================================================================

/// Ordered numeric features of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, idx: usize) -> &f32 {
        &self.0[idx]
    }
}

// =============================================================================
// FeatureExtractor
// =============================================================================

/// Maps records to feature vectors following a [`FeatureSchema`].
///
/// Extraction is pure: no state, no side effects, and the same record always
/// yields the same vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    /// Extractor for the standard 10-field layout.
    pub fn standard() -> Self {
        Self::new(FeatureSchema::standard())
    }

    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.schema.n_features()
    }

    /// Extract the feature vector of one record.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRecord`] if any schema field is missing (`NaN`),
    /// infinite, or negative.
    pub fn extract(&self, record: &HouseRecord) -> Result<FeatureVector> {
        self.extract_at(record, None)
    }

    fn extract_at(&self, record: &HouseRecord, row: Option<usize>) -> Result<FeatureVector> {
        let mut values = Vec::with_capacity(self.n_features());
        for &field in self.schema.fields() {
            let value = field.value(record);
            check_value(value).map_err(|defect| Error::invalid_record(row, field.name(), defect))?;
            values.push(value);
        }
        Ok(FeatureVector(values))
    }

    /// Extract a row-major matrix of shape `(records.len(), n_features)`.
    ///
    /// The error, if any, reports the lowest failing row index.
    pub fn extract_matrix(
        &self,
        records: &[HouseRecord],
        parallelism: Parallelism,
    ) -> Result<Array2<f32>> {
        let n_features = self.n_features();
        let rows = parallelism.maybe_par_map(0..records.len(), |i| {
            self.extract_at(&records[i], Some(i))
        });

        let mut flat = Vec::with_capacity(records.len() * n_features);
        for row in rows {
            flat.extend_from_slice(row?.as_slice());
        }
        Ok(Array2::from_shape_vec((records.len(), n_features), flat)
            .expect("one row of n_features per record"))
    }

    /// Read the target of one record.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRecord`] if the sale price is absent, non-finite or
    /// negative.
    pub fn target(&self, record: &HouseRecord, row: Option<usize>) -> Result<f32> {
        let price = record
            .sale_price
            .ok_or_else(|| Error::invalid_record(row, self.schema.target(), FieldDefect::Missing))?;
        check_value(price).map_err(|defect| Error::invalid_record(row, self.schema.target(), defect))?;
        Ok(price)
    }

    /// Read the targets of all records.
    pub fn targets(&self, records: &[HouseRecord]) -> Result<Vec<f32>> {
        records
            .iter()
            .enumerate()
            .map(|(i, r)| self.target(r, Some(i)))
            .collect()
    }
}

/// Extract the standard 10-field feature vector of a record.
pub fn extract(record: &HouseRecord) -> Result<FeatureVector> {
    FeatureExtractor::standard().extract(record)
}

#[inline]
fn check_value(value: f32) -> std::result::Result<(), FieldDefect> {
    if value.is_nan() {
        Err(FieldDefect::Missing)
    } else if value.is_infinite() {
        Err(FieldDefect::NonFinite)
    } else if value < 0.0 {
        Err(FieldDefect::Negative)
    } else {
        Ok(())
    }
}
