use super::config::ConfigError;
use crate::core::io::sink::SinkError;
use crate::engine::cache::CacheError;
use crate::engine::inference::InferenceError;
use crate::engine::metrics::MetricError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Metric '{metric}' on dataset '{dataset}' failed: {source}")]
    Metric {
        metric: String,
        dataset: String,
        #[source]
        source: MetricError,
    },

    #[error("Failed to write results: {0}")]
    Sink(#[from] SinkError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
