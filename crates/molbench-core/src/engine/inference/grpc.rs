use super::proto::generative_sampler_client::GenerativeSamplerClient;
use super::proto::{GenerativeModel, GenerativeSpec, SmilesList};
use super::{InferenceClient, InferenceError, SamplingParams};
use crate::core::models::embedding::Embedding;
use crate::core::models::sample::SampleResult;
use tokio::runtime::Runtime;
use tonic::Status;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

/// Radius used when no scaled radius is requested, in latent-space units.
pub const DEFAULT_MIN_JITTER_RADIUS: f64 = 2.1;

fn status_error(status: Status) -> InferenceError {
    InferenceError::Status {
        code: format!("{:?}", status.code()),
        message: status.message().to_string(),
    }
}

/// Maps a scaled radius onto the model's latent space.
///
/// A zero scale means "use the minimum jitter radius".
pub fn wire_radius(scaled_radius: f64, min_jitter_radius: f64) -> f32 {
    if scaled_radius == 0.0 {
        min_jitter_radius as f32
    } else {
        (scaled_radius * min_jitter_radius) as f32
    }
}

/// Shapes a flat embedding as `[max_len, width]` when it divides evenly.
pub fn shape_embedding(values: Vec<f32>, max_len: usize) -> Result<Embedding, InferenceError> {
    if values.is_empty() {
        return Err(InferenceError::InvalidResponse("empty embedding".to_string()));
    }
    if max_len > 0 && values.len() % max_len == 0 {
        let width = values.len() / max_len;
        Ok(Embedding::new(values, vec![max_len, width])?)
    } else {
        Ok(Embedding::flat(values))
    }
}

fn to_i32(value: usize, what: &str) -> Result<i32, InferenceError> {
    i32::try_from(value)
        .map_err(|_| InferenceError::InvalidResponse(format!("{} {} does not fit the protocol", what, value)))
}

/// Blocking client for a remote generative model served over gRPC.
///
/// Owns a single-threaded runtime; each call blocks until the RPC completes.
/// `force_unique` and `sanitize` have no wire representation and are not sent.
pub struct GrpcClient {
    runtime: Runtime,
    client: GenerativeSamplerClient<Channel>,
    model: GenerativeModel,
    display_name: String,
    min_jitter_radius: f64,
}

impl GrpcClient {
    pub fn connect(
        endpoint: &str,
        model: GenerativeModel,
        min_jitter_radius: f64,
    ) -> Result<Self, InferenceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(InferenceError::Runtime)?;
        let connect_error = |reason: String| InferenceError::Connect {
            endpoint: endpoint.to_string(),
            reason,
        };
        let target =
            Endpoint::from_shared(endpoint.to_string()).map_err(|e| connect_error(e.to_string()))?;
        let channel = runtime
            .block_on(target.connect())
            .map_err(|e| connect_error(e.to_string()))?;
        info!(endpoint, model = %model, "Connected to inference server.");
        Ok(Self {
            runtime,
            client: GenerativeSamplerClient::new(channel),
            model,
            display_name: model.as_str_name().to_string(),
            min_jitter_radius,
        })
    }

    /// Overrides the model name recorded in results and cache keys.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    fn spec(&self, smiles: Vec<String>) -> GenerativeSpec {
        GenerativeSpec {
            model: self.model as i32,
            smiles,
            radius: None,
            num_requested: None,
            padding: None,
        }
    }

    fn sample_result(list: SmilesList) -> Result<SampleResult, InferenceError> {
        Ok(SampleResult::from_molecules(list.generated_smiles)?)
    }
}

impl InferenceClient for GrpcClient {
    fn model_name(&self) -> &str {
        &self.display_name
    }

    fn iteration(&self) -> Result<i64, InferenceError> {
        let spec = self.spec(Vec::new());
        let mut client = self.client.clone();
        let value = self
            .runtime
            .block_on(client.get_iteration(spec))
            .map_err(status_error)?
            .into_inner();
        Ok(value.iteration as i64)
    }

    fn embed(&self, molecule: &str, max_len: usize) -> Result<Embedding, InferenceError> {
        let spec = GenerativeSpec {
            padding: Some(to_i32(max_len, "padding")?),
            ..self.spec(vec![molecule.to_string()])
        };
        let mut client = self.client.clone();
        let list = self
            .runtime
            .block_on(client.smiles_to_embedding(spec))
            .map_err(status_error)?
            .into_inner();
        debug!(molecule, values = list.embedding.len(), "Received embedding.");
        shape_embedding(list.embedding, max_len)
    }

    fn find_similar(
        &self,
        molecule: &str,
        params: &SamplingParams,
    ) -> Result<SampleResult, InferenceError> {
        let spec = GenerativeSpec {
            radius: Some(wire_radius(params.radius, self.min_jitter_radius)),
            num_requested: Some(to_i32(params.num_samples, "sample count")?),
            ..self.spec(vec![molecule.to_string()])
        };
        let mut client = self.client.clone();
        let list = self
            .runtime
            .block_on(client.find_similars(spec))
            .map_err(status_error)?
            .into_inner();
        Self::sample_result(list)
    }

    fn interpolate(
        &self,
        molecules: &[String],
        num_points: usize,
        radius: f64,
    ) -> Result<SampleResult, InferenceError> {
        let spec = GenerativeSpec {
            radius: Some(wire_radius(radius, self.min_jitter_radius)),
            num_requested: Some(to_i32(num_points, "point count")?),
            ..self.spec(molecules.to_vec())
        };
        let mut client = self.client.clone();
        let list = self
            .runtime
            .block_on(client.interpolate(spec))
            .map_err(status_error)?
            .into_inner();
        Self::sample_result(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_scales_minimum_jitter() {
        assert!((wire_radius(0.5, 2.0) - 1.0).abs() < 1e-6);
        assert!((wire_radius(0.0, 2.1) - 2.1).abs() < 1e-6);
    }

    #[test]
    fn embeddings_are_shaped_by_padding() {
        let shaped = shape_embedding(vec![0.0; 12], 4).unwrap();
        assert_eq!(shaped.shape(), &[4, 3]);
        let flat = shape_embedding(vec![0.0; 10], 4).unwrap();
        assert_eq!(flat.shape(), &[10]);
        assert!(shape_embedding(Vec::new(), 4).is_err());
    }

    #[test]
    fn connecting_to_an_invalid_endpoint_fails() {
        let result = GrpcClient::connect("not a uri", GenerativeModel::Cddd, 1.0);
        assert!(matches!(result, Err(InferenceError::Connect { .. })));
    }
}
