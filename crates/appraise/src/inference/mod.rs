//! Inference over trained forests.

mod predictor;

pub use predictor::{DEFAULT_BLOCK_SIZE, Predictor};
