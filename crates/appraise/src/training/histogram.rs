//! Gradient histograms over binned features.
//!
//! Bins accumulate in `f64` even though gradients are `f32`: prices are in
//! the hundreds of thousands and the subtraction trick takes differences of
//! large sums.

use super::binning::BinnedMatrix;
use super::gradients::Gradients;
use crate::utils::Parallelism;

/// Accumulated gradient statistics of a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradStats {
    pub grad: f64,
    pub hess: f64,
    pub count: u32,
}

impl GradStats {
    #[inline]
    pub fn new(grad: f64, hess: f64, count: u32) -> Self {
        Self { grad, hess, count }
    }

    #[inline]
    fn add(&mut self, grad: f32, hess: f32) {
        self.grad += grad as f64;
        self.hess += hess as f64;
        self.count += 1;
    }

    #[inline]
    pub fn sub(self, other: GradStats) -> GradStats {
        GradStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }

    #[inline]
    pub fn merge(self, other: GradStats) -> GradStats {
        GradStats {
            grad: self.grad + other.grad,
            hess: self.hess + other.hess,
            count: self.count + other.count,
        }
    }
}

/// Histogram of one feature.
#[derive(Debug, Clone)]
pub struct FeatureHistogram {
    feature: usize,
    bins: Vec<GradStats>,
}

impl FeatureHistogram {
    #[inline]
    pub fn feature(&self) -> usize {
        self.feature
    }

    #[inline]
    pub fn bins(&self) -> &[GradStats] {
        &self.bins
    }
}

/// Histograms of all features for one tree node.
#[derive(Debug, Clone)]
pub struct NodeHistogram {
    features: Vec<FeatureHistogram>,
}

impl NodeHistogram {
    /// Zeroed histogram sized to the binned matrix.
    pub fn zeros(binned: &BinnedMatrix) -> Self {
        let cuts = binned.cuts();
        let features = (0..binned.n_features())
            .map(|feature| FeatureHistogram {
                feature,
                bins: vec![GradStats::default(); cuts.n_bins(feature)],
            })
            .collect();
        Self { features }
    }

    /// Build from the gradients of `rows`.
    pub fn build(
        binned: &BinnedMatrix,
        gradients: &Gradients,
        rows: &[u32],
        parallelism: Parallelism,
    ) -> Self {
        let mut hist = Self::zeros(binned);
        let grads = gradients.grads();
        let hess = gradients.hess();

        parallelism.maybe_par_for_each(&mut hist.features, |fh| {
            let feature_bins = binned.feature_bins(fh.feature);
            for &row in rows {
                let r = row as usize;
                fh.bins[feature_bins[r] as usize].add(grads[r], hess[r]);
            }
        });
        hist
    }

    /// Sibling histogram via `parent - child`.
    pub fn subtract(parent: &NodeHistogram, child: &NodeHistogram) -> Self {
        let features = parent
            .features
            .iter()
            .zip(&child.features)
            .map(|(p, c)| FeatureHistogram {
                feature: p.feature,
                bins: p.bins.iter().zip(&c.bins).map(|(&a, &b)| a.sub(b)).collect(),
            })
            .collect();
        Self { features }
    }

    #[inline]
    pub fn features(&self) -> &[FeatureHistogram] {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    fn setup() -> (BinnedMatrix, Gradients) {
        let x = array![[0.0f32, 1.0], [1.0, 1.0], [2.0, 0.0], [2.0, 0.0]];
        let binned = BinnedMatrix::from_features(x.view(), 255, Parallelism::Sequential);
        let mut g = Gradients::new(4);
        for (i, grad) in [1.0, -2.0, 3.0, 0.5].into_iter().enumerate() {
            g.set(i, grad, 1.0);
        }
        (binned, g)
    }

    #[test]
    fn build_accumulates_per_bin() {
        let (binned, g) = setup();
        let hist = NodeHistogram::build(&binned, &g, &[0, 1, 2, 3], Parallelism::Sequential);

        let f0 = hist.features()[0].bins();
        assert_eq!(f0.len(), 3);
        assert_eq!(f0[0], GradStats::new(1.0, 1.0, 1));
        assert_eq!(f0[1], GradStats::new(-2.0, 1.0, 1));
        assert_eq!(f0[2], GradStats::new(3.5, 2.0, 2));
    }

    #[test]
    fn subtraction_matches_direct_build() {
        let (binned, g) = setup();
        let parent = NodeHistogram::build(&binned, &g, &[0, 1, 2, 3], Parallelism::Parallel);
        let left = NodeHistogram::build(&binned, &g, &[0, 2], Parallelism::Parallel);
        let right = NodeHistogram::build(&binned, &g, &[1, 3], Parallelism::Sequential);
        let derived = NodeHistogram::subtract(&parent, &left);

        for (d, r) in derived.features().iter().zip(right.features()) {
            for (a, b) in d.bins().iter().zip(r.bins()) {
                assert_abs_diff_eq!(a.grad, b.grad, epsilon = 1e-12);
                assert_abs_diff_eq!(a.hess, b.hess, epsilon = 1e-12);
                assert_eq!(a.count, b.count);
            }
        }
    }
}
