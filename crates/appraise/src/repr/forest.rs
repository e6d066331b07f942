//! Additive forest of regression trees.

use thiserror::Error;

use super::tree::{Tree, TreeValidationError};

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestValidationError {
    #[error("base score is not finite")]
    NonFiniteBaseScore,
    #[error("tree {tree_idx}: {error}")]
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
    #[error("tree {tree_idx}: node {node} splits on feature {feature}, but the model has {n_features}")]
    FeatureOutOfBounds {
        tree_idx: usize,
        node: u32,
        feature: u32,
        n_features: usize,
    },
}

/// Forest of regression trees.
///
/// The prediction for a row is `base_score + Σ tree(row)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    base_score: f32,
    n_features: usize,
}

impl Forest {
    /// Create an empty forest over `n_features` inputs.
    pub fn new(n_features: usize) -> Self {
        Self {
            trees: Vec::new(),
            base_score: 0.0,
            n_features,
        }
    }

    /// Set the base score.
    pub fn with_base_score(mut self, base_score: f32) -> Self {
        self.base_score = base_score;
        self
    }

    /// Add a tree to the forest.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Predict for a single row of features.
    ///
    /// Accumulates in `f64` so the sum of many small leaf values does not
    /// drift for prices in the hundreds of thousands.
    #[inline]
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        debug_assert_eq!(features.len(), self.n_features);
        let sum = self
            .trees
            .iter()
            .fold(self.base_score as f64, |acc, t| acc + t.predict_row(features) as f64);
        sum as f32
    }

    /// Validate every tree plus the cross-tree invariants: finite base score
    /// and split features below `n_features`.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        if !self.base_score.is_finite() {
            return Err(ForestValidationError::NonFiniteBaseScore);
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|error| ForestValidationError::InvalidTree { tree_idx, error })?;

            for node in 0..tree.n_nodes() as u32 {
                if tree.is_leaf(node) {
                    continue;
                }
                let feature = tree.split_index(node);
                if feature as usize >= self.n_features {
                    return Err(ForestValidationError::FeatureOutOfBounds {
                        tree_idx,
                        node,
                        feature,
                        n_features: self.n_features,
                    });
                }
            }
        }
        Ok(())
    }
}
