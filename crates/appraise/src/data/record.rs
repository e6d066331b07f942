use std::fmt;

use serde::{Deserialize, Serialize};

/// One house as read from the data source.
///
/// Every feature field must be finite and non-negative by the time it reaches
/// the [`FeatureExtractor`](crate::FeatureExtractor). The data source marks an
/// empty or unparseable cell as `NaN`, which extraction reports as missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HouseRecord {
    /// Overall material and finish rating (1-10).
    pub overall_quality: f32,
    /// Above grade living area, square feet.
    pub above_grade_living_area: f32,
    /// Garage size in car capacity.
    pub garage_car_capacity: f32,
    /// Garage area, square feet.
    pub garage_area: f32,
    /// Total basement area, square feet.
    pub total_basement_area: f32,
    /// First floor area, square feet.
    pub first_floor_area: f32,
    /// Full bathrooms above grade.
    pub full_bath_count: f32,
    pub year_built: f32,
    /// Remodel year; equals `year_built` when never remodeled.
    pub year_remodeled: f32,
    /// Lot size, square feet.
    pub lot_area: f32,
    /// Sale price. Required for training and evaluation, ignored for prediction.
    pub sale_price: Option<f32>,
}

impl HouseRecord {
    /// Returns a copy with the sale price set.
    pub fn with_sale_price(mut self, price: f32) -> Self {
        self.sale_price = Some(price);
        self
    }

    /// Returns a copy with the sale price cleared.
    pub fn without_sale_price(mut self) -> Self {
        self.sale_price = None;
        self
    }
}

/// A point prediction of the sale price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub sale_price: f32,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.sale_price)
    }
}
