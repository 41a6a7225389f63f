use super::{InferenceClient, InferenceError, SamplingParams};
use crate::core::models::embedding::Embedding;
use crate::core::models::sample::SampleResult;
use crate::engine::cache::{EmbeddingKey, ModelIdentity, ResultCache, SamplingKey};
use tracing::debug;

/// Inference routed through a result cache.
///
/// Every request is looked up first; on a miss the client is called exactly once
/// and the result is written back before being returned.
pub struct CachedInference<'a> {
    client: &'a dyn InferenceClient,
    cache: &'a dyn ResultCache,
    model: ModelIdentity,
}

impl<'a> CachedInference<'a> {
    /// Resolves the model iteration from the client once, up front.
    pub fn new(
        client: &'a dyn InferenceClient,
        cache: &'a dyn ResultCache,
    ) -> Result<Self, InferenceError> {
        let iteration = client.iteration()?;
        let model = ModelIdentity::new(client.model_name(), iteration);
        Ok(Self::with_identity(client, cache, model))
    }

    pub fn with_identity(
        client: &'a dyn InferenceClient,
        cache: &'a dyn ResultCache,
        model: ModelIdentity,
    ) -> Self {
        Self {
            client,
            cache,
            model,
        }
    }

    pub fn model(&self) -> &ModelIdentity {
        &self.model
    }

    pub fn embed(&self, molecule: &str, max_len: usize) -> Result<Embedding, InferenceError> {
        let key = EmbeddingKey::new(&self.model, molecule, max_len);
        if let Some(hit) = self.cache.fetch_embedding(&key)? {
            debug!(molecule, "Embedding cache hit.");
            return Ok(hit);
        }
        debug!(molecule, "Embedding cache miss.");
        let embedding = self.client.embed(molecule, max_len)?;
        self.cache.insert_embedding(key, embedding.clone())?;
        Ok(embedding)
    }

    pub fn find_similar(
        &self,
        molecule: &str,
        params: &SamplingParams,
    ) -> Result<SampleResult, InferenceError> {
        let key = SamplingKey::find_similar(&self.model, molecule, params);
        self.sample(key, molecule, || self.client.find_similar(molecule, params))
    }

    pub fn interpolate(
        &self,
        molecules: &[String],
        num_points: usize,
        radius: f64,
    ) -> Result<SampleResult, InferenceError> {
        let first = molecules.first().ok_or_else(|| {
            InferenceError::InvalidResponse("interpolation needs at least one molecule".to_string())
        })?;
        let key = SamplingKey::interpolate(&self.model, molecules, num_points, radius);
        self.sample(key, first, || {
            self.client.interpolate(molecules, num_points, radius)
        })
    }

    fn sample(
        &self,
        key: SamplingKey,
        input: &str,
        generate: impl FnOnce() -> Result<SampleResult, InferenceError>,
    ) -> Result<SampleResult, InferenceError> {
        if let Some(hit) = self.cache.fetch_sample(&key)? {
            debug!(input, "Sample cache hit.");
            return Ok(hit);
        }
        debug!(input, "Sample cache miss.");
        let sample = generate()?;
        if sample.input().trim() != input.trim() {
            return Err(InferenceError::MissingInputMarker {
                expected: input.to_string(),
                found: sample.input().to_string(),
            });
        }
        self.cache.insert_sample(key, sample.clone())?;
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cache::MemoryCache;
    use crate::engine::inference::testing::ScriptedClient;

    #[test]
    fn miss_calls_client_once_then_hits() {
        let client = ScriptedClient::new("CDDD", 4).with_sample("CCO", &["CCO", "CCC", "CCN"]);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        assert_eq!(inference.model(), &ModelIdentity::new("CDDD", 4));

        let params = SamplingParams::new(2, 0.1);
        let first = inference.find_similar("CCO", &params).unwrap();
        let second = inference.find_similar("CCO", &params).unwrap();
        assert_eq!(first, second);
        assert_eq!(client.sample_calls(), 1);
        assert_eq!(cache.stats().samples, 1);
    }

    #[test]
    fn different_radius_is_a_different_request() {
        let client = ScriptedClient::new("CDDD", 0).with_sample("CCO", &["CCO", "CCC"]);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        inference.find_similar("CCO", &SamplingParams::new(1, 0.1)).unwrap();
        inference.find_similar("CCO", &SamplingParams::new(1, 0.2)).unwrap();
        assert_eq!(client.sample_calls(), 2);
    }

    #[test]
    fn missing_marker_is_rejected_and_not_cached() {
        let client = ScriptedClient::new("CDDD", 0).with_sample("CCO", &["CCC", "CCN"]);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let err = inference
            .find_similar("CCO", &SamplingParams::new(1, 0.1))
            .unwrap_err();
        assert!(matches!(err, InferenceError::MissingInputMarker { .. }));
        assert_eq!(cache.stats().samples, 0);
    }

    #[test]
    fn embeddings_are_cached_per_max_len() {
        let client = ScriptedClient::new("CDDD", 0);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        inference.embed("CCO", 8).unwrap();
        inference.embed("CCO", 8).unwrap();
        inference.embed("CCO", 16).unwrap();
        assert_eq!(client.embed_calls(), 2);
        assert_eq!(cache.stats().embeddings, 2);
    }

    #[test]
    fn interpolation_checks_first_molecule() {
        let client = ScriptedClient::new("CDDD", 0);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let molecules = vec!["CCO".to_string(), "CCN".to_string()];
        let sample = inference.interpolate(&molecules, 3, 0.0).unwrap();
        assert_eq!(sample.input(), "CCO");
        assert_eq!(sample.candidates().len(), 3);
    }
}
