//! Access to a generative model: the client seam, the cached layer every metric
//! goes through, and the gRPC transport.

mod cached;
#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(feature = "grpc")]
pub mod proto;
#[cfg(test)]
pub(crate) mod testing;

pub use cached::CachedInference;

use crate::core::models::ModelError;
use crate::core::models::embedding::Embedding;
use crate::core::models::sample::SampleResult;
use crate::engine::cache::CacheError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Could not connect to inference endpoint '{endpoint}': {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Inference transport failure: {0}")]
    Transport(String),

    #[error("Inference server returned {code}: {message}")]
    Status { code: String, message: String },

    #[error("Invalid inference response: {0}")]
    InvalidResponse(String),

    #[error("Sample does not start with its input: expected '{expected}', found '{found}'")]
    MissingInputMarker { expected: String, found: String },

    #[error("Failed to start inference runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Cache failure: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Options for a similarity sampling request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub num_samples: usize,
    /// Scaled sampling radius; the client maps it to the model's latent units.
    pub radius: f64,
    pub force_unique: bool,
    pub sanitize: bool,
}

impl SamplingParams {
    pub fn new(num_samples: usize, radius: f64) -> Self {
        Self {
            num_samples,
            radius,
            force_unique: false,
            sanitize: false,
        }
    }
}

/// A generative model that can embed molecules and sample around them.
///
/// Sampling results always begin with the input molecule.
pub trait InferenceClient: Send + Sync {
    fn model_name(&self) -> &str;

    /// The checkpoint iteration currently served.
    fn iteration(&self) -> Result<i64, InferenceError>;

    fn embed(&self, molecule: &str, max_len: usize) -> Result<Embedding, InferenceError>;

    fn find_similar(
        &self,
        molecule: &str,
        params: &SamplingParams,
    ) -> Result<SampleResult, InferenceError>;

    fn interpolate(
        &self,
        molecules: &[String],
        num_points: usize,
        radius: f64,
    ) -> Result<SampleResult, InferenceError>;
}
