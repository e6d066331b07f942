//! Canonical tree and forest representation.
//!
//! - [`Tree`]: immutable SoA tree used for inference and persistence
//! - [`MutableTree`]: tree under construction during training
//! - [`Forest`]: base score plus additive trees

mod forest;
mod tree;

pub use forest::{Forest, ForestValidationError};
pub use tree::{MutableTree, NodeId, Tree, TreeValidationError};
