use super::ModelError;
use super::embedding::Embedding;
use serde::{Deserialize, Serialize};

/// The output of a sampling operation against a generative model.
///
/// The first molecule is always the input that produced the sample (the identity
/// marker); generated candidates follow it. Embeddings are either absent or aligned
/// one-to-one with the molecules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSampleResult")]
pub struct SampleResult {
    molecules: Vec<String>,
    embeddings: Vec<Embedding>,
}

#[derive(Deserialize)]
struct RawSampleResult {
    molecules: Vec<String>,
    embeddings: Vec<Embedding>,
}

impl TryFrom<RawSampleResult> for SampleResult {
    type Error = ModelError;

    fn try_from(raw: RawSampleResult) -> Result<Self, Self::Error> {
        Self::new(raw.molecules, raw.embeddings)
    }
}

impl SampleResult {
    pub fn new(molecules: Vec<String>, embeddings: Vec<Embedding>) -> Result<Self, ModelError> {
        if molecules.is_empty() {
            return Err(ModelError::EmptySample);
        }
        if !embeddings.is_empty() && embeddings.len() != molecules.len() {
            return Err(ModelError::EmbeddingCount {
                molecules: molecules.len(),
                embeddings: embeddings.len(),
            });
        }
        Ok(Self {
            molecules,
            embeddings,
        })
    }

    pub fn from_molecules(molecules: Vec<String>) -> Result<Self, ModelError> {
        Self::new(molecules, Vec::new())
    }

    pub fn molecules(&self) -> &[String] {
        &self.molecules
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    /// The identity marker: the molecule the sample was generated from.
    pub fn input(&self) -> &str {
        &self.molecules[0]
    }

    /// Generated molecules, excluding the identity marker.
    pub fn candidates(&self) -> &[String] {
        &self.molecules[1..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn candidates_skip_the_identity_marker() {
        let sample = SampleResult::from_molecules(strings(&["CCO", "CCC", "CCN"])).unwrap();
        assert_eq!(sample.input(), "CCO");
        assert_eq!(sample.candidates(), &strings(&["CCC", "CCN"])[..]);
    }

    #[test]
    fn empty_sample_is_rejected() {
        assert_eq!(
            SampleResult::from_molecules(Vec::new()),
            Err(ModelError::EmptySample)
        );
    }

    #[test]
    fn misaligned_embeddings_are_rejected() {
        let result = SampleResult::new(
            strings(&["CCO", "CCC"]),
            vec![Embedding::flat(vec![0.0, 1.0])],
        );
        assert_eq!(
            result,
            Err(ModelError::EmbeddingCount {
                molecules: 2,
                embeddings: 1
            })
        );
    }

    #[test]
    fn decoding_goes_through_validation() {
        let empty = serde_json::json!({ "molecules": [], "embeddings": [] });
        let err = serde_json::from_value::<SampleResult>(empty).unwrap_err();
        assert!(err.to_string().contains("at least the input molecule"));

        let bytes = bincode::serialize(&(Vec::<String>::new(), Vec::<Embedding>::new())).unwrap();
        assert!(bincode::deserialize::<SampleResult>(&bytes).is_err());

        let sample = SampleResult::from_molecules(strings(&["CCO", "CCC"])).unwrap();
        let bytes = bincode::serialize(&sample).unwrap();
        assert_eq!(bincode::deserialize::<SampleResult>(&bytes).unwrap(), sample);
    }
}
