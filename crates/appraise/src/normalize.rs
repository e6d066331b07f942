//! Optional feature normalization.
//!
//! Normalization is off unless the configuration asks for it. When enabled,
//! the scaler is fitted on the training matrix, stored inside the trained
//! model, and applied identically at prediction time.

use ndarray::{ArrayView2, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};

/// Feature normalization applied before training and prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Raw feature values.
    #[default]
    None,
    /// Rescale each feature to `[0, 1]` using the training min and max.
    MinMax,
}

/// Per-feature min-max scaler.
///
/// `x' = (x - min) / (max - min)`. A feature that was constant in training
/// maps to `0.0`. Values outside the training range are not clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Vec<f32>,
    maxs: Vec<f32>,
}

impl MinMaxScaler {
    /// Fit on a row-major `(n_rows, n_features)` matrix.
    ///
    /// An empty matrix gives a scaler with `min = max = 0` per feature.
    pub fn fit(features: ArrayView2<f32>) -> Self {
        let (mins, maxs): (Vec<f32>, Vec<f32>) = features
            .axis_iter(Axis(1))
            .map(|col| {
                let mut it = col.iter().copied();
                let first = it.next().unwrap_or(0.0);
                it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)))
            })
            .unzip();
        Self { mins, maxs }
    }

    /// Rebuild from stored parameters. Returns `None` if the lengths differ.
    pub fn from_parts(mins: Vec<f32>, maxs: Vec<f32>) -> Option<Self> {
        (mins.len() == maxs.len()).then_some(Self { mins, maxs })
    }

    pub fn n_features(&self) -> usize {
        self.mins.len()
    }

    pub fn mins(&self) -> &[f32] {
        &self.mins
    }

    pub fn maxs(&self) -> &[f32] {
        &self.maxs
    }

    /// Scale one row in place.
    #[inline]
    pub fn transform_row(&self, row: &mut [f32]) {
        debug_assert_eq!(row.len(), self.n_features());
        for ((v, &lo), &hi) in row.iter_mut().zip(&self.mins).zip(&self.maxs) {
            let range = hi - lo;
            *v = if range > 0.0 { (*v - lo) / range } else { 0.0 };
        }
    }

    /// Scale a row-major matrix in place.
    pub fn transform(&self, mut features: ArrayViewMut2<f32>) {
        for mut row in features.axis_iter_mut(Axis(0)) {
            match row.as_slice_mut() {
                Some(slice) => self.transform_row(slice),
                None => {
                    let mut buf = row.to_vec();
                    self.transform_row(&mut buf);
                    row.iter_mut().zip(buf).for_each(|(dst, v)| *dst = v);
                }
            }
        }
    }
}
