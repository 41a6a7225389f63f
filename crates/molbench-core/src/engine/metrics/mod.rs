//! Metric engines. Each engine turns one dataset plus one variation into a
//! [`MetricOutcome`](crate::core::models::record::MetricOutcome).

pub mod modelability;
pub mod nearest_neighbor;
pub mod registry;
pub mod sampling;

use crate::core::regression::{EstimatorFamily, RegressionError};
use crate::engine::inference::InferenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("Metric denominator is zero: {molecules} molecules with {num_samples} samples each")]
    ZeroDenominator { molecules: usize, num_samples: usize },

    #[error("Novelty requires a training set but none was provided")]
    MissingTrainingSet,

    #[error("Modelability needs exactly one property column, dataset '{dataset}' has {found}")]
    PropertyColumns { dataset: String, found: usize },

    #[error("Dataset '{0}' is empty")]
    EmptyDataset(String),

    #[error("Embedding for '{molecule}' has {found} values, expected {expected}")]
    EmbeddingLength {
        molecule: String,
        expected: usize,
        found: usize,
    },

    #[error("Every one of the {combinations} parameter combinations for '{family}' failed")]
    AllCombinationsFailed {
        family: EstimatorFamily,
        combinations: usize,
    },

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Regression failed: {0}")]
    Regression(#[from] RegressionError),
}
