use super::{InferenceClient, InferenceError, SamplingParams};
use crate::core::models::embedding::Embedding;
use crate::core::models::sample::SampleResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-process client with canned answers and call counters.
pub(crate) struct ScriptedClient {
    name: String,
    iteration: i64,
    samples: HashMap<String, Vec<String>>,
    embeddings: HashMap<String, Embedding>,
    sample_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new(name: &str, iteration: i64) -> Self {
        Self {
            name: name.to_string(),
            iteration,
            samples: HashMap::new(),
            embeddings: HashMap::new(),
            sample_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_sample(mut self, molecule: &str, molecules: &[&str]) -> Self {
        self.samples.insert(
            molecule.to_string(),
            molecules.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub(crate) fn with_embedding(mut self, molecule: &str, embedding: Embedding) -> Self {
        self.embeddings.insert(molecule.to_string(), embedding);
        self
    }

    pub(crate) fn sample_calls(&self) -> usize {
        self.sample_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl InferenceClient for ScriptedClient {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn iteration(&self) -> Result<i64, InferenceError> {
        Ok(self.iteration)
    }

    fn embed(&self, molecule: &str, max_len: usize) -> Result<Embedding, InferenceError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(embedding) = self.embeddings.get(molecule) {
            return Ok(embedding.clone());
        }
        // Two features per position derived from the characters of the molecule.
        let rows = max_len.max(1);
        let bytes = molecule.as_bytes();
        let values: Vec<f32> = (0..rows)
            .flat_map(|r| {
                let b = bytes.get(r).copied().unwrap_or(0) as f32;
                [b / 100.0, (r as f32 + 1.0) * b / 1000.0]
            })
            .collect();
        Ok(Embedding::new(values, vec![rows, 2])?)
    }

    fn find_similar(
        &self,
        molecule: &str,
        params: &SamplingParams,
    ) -> Result<SampleResult, InferenceError> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        let molecules = match self.samples.get(molecule) {
            Some(scripted) => scripted.clone(),
            None => std::iter::once(molecule.to_string())
                .chain((0..params.num_samples).map(|i| format!("{}{}", molecule, "C".repeat(i + 1))))
                .collect(),
        };
        Ok(SampleResult::from_molecules(molecules)?)
    }

    fn interpolate(
        &self,
        molecules: &[String],
        num_points: usize,
        _radius: f64,
    ) -> Result<SampleResult, InferenceError> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        let first = molecules.first().cloned().unwrap_or_default();
        let generated = (0..num_points).map(|i| format!("{}{}", first, "N".repeat(i + 1)));
        Ok(SampleResult::from_molecules(
            std::iter::once(first.clone()).chain(generated).collect(),
        )?)
    }
}
