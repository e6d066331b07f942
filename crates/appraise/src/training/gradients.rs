//! Structure-of-Arrays gradient buffer.
//!
//! Gradients and hessians live in separate contiguous `f32` arrays indexed
//! by row, which is the access pattern of histogram building.

/// Per-row gradients and hessians of the loss.
#[derive(Debug, Clone)]
pub struct Gradients {
    grads: Vec<f32>,
    hess: Vec<f32>,
}

impl Gradients {
    /// Zeroed buffer for `n_rows` rows.
    pub fn new(n_rows: usize) -> Self {
        Self {
            grads: vec![0.0; n_rows],
            hess: vec![0.0; n_rows],
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.grads.len()
    }

    #[inline]
    pub fn get(&self, row: usize) -> (f32, f32) {
        (self.grads[row], self.hess[row])
    }

    #[inline]
    pub fn set(&mut self, row: usize, grad: f32, hess: f32) {
        self.grads[row] = grad;
        self.hess[row] = hess;
    }

    #[inline]
    pub fn grads(&self) -> &[f32] {
        &self.grads
    }

    #[inline]
    pub fn hess(&self) -> &[f32] {
        &self.hess
    }

    /// Mutable access to both arrays at once.
    #[inline]
    pub fn as_mut_slices(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.grads, &mut self.hess)
    }

    /// Sum of gradients and hessians over `rows`.
    pub fn sum(&self, rows: &[u32]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &r| {
            (g + self.grads[r as usize] as f64, h + self.hess[r as usize] as f64)
        })
    }
}
