//! Data structures describing inference results, datasets and metric outputs.

pub mod dataset;
pub mod embedding;
pub mod fingerprint;
pub mod record;
pub mod sample;
pub mod training;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ModelError {
    #[error("Embedding shape {shape:?} does not describe {len} values")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    #[error("A sample result must contain at least the input molecule")]
    EmptySample,

    #[error("Sample result has {molecules} molecules but {embeddings} embeddings")]
    EmbeddingCount { molecules: usize, embeddings: usize },

    #[error("Dataset '{dataset}' column '{column}' has {found} rows, expected {expected}")]
    ColumnLength {
        dataset: String,
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Fingerprint width mismatch in dataset '{dataset}': expected {expected} bits, found {found}")]
    FingerprintWidth {
        dataset: String,
        expected: usize,
        found: usize,
    },
}
