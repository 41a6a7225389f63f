use crate::engine::inference::SamplingParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The model a cached result was produced by: its name and checkpoint iteration.
///
/// The iteration is part of every key so that results from a retrained checkpoint
/// never alias results from an older one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub name: String,
    pub iteration: i64,
}

impl ModelIdentity {
    pub fn new(name: impl Into<String>, iteration: i64) -> Self {
        Self {
            name: name.into(),
            iteration,
        }
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.iteration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplingOperation {
    FindSimilar,
    Interpolate,
}

fn normalized_bits(radius: f64) -> u64 {
    // -0.0 and 0.0 request the same thing.
    if radius == 0.0 { 0.0f64.to_bits() } else { radius.to_bits() }
}

/// Identifies one sampling request. Field order is the serialized layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SamplingKey {
    model: String,
    model_iteration: i64,
    operation: SamplingOperation,
    molecules: Vec<String>,
    num_samples: usize,
    radius_bits: u64,
    force_unique: bool,
    sanitize: bool,
}

impl SamplingKey {
    pub fn find_similar(model: &ModelIdentity, molecule: &str, params: &SamplingParams) -> Self {
        Self {
            model: model.name.clone(),
            model_iteration: model.iteration,
            operation: SamplingOperation::FindSimilar,
            molecules: vec![molecule.to_string()],
            num_samples: params.num_samples,
            radius_bits: normalized_bits(params.radius),
            force_unique: params.force_unique,
            sanitize: params.sanitize,
        }
    }

    pub fn interpolate(
        model: &ModelIdentity,
        molecules: &[String],
        num_points: usize,
        radius: f64,
    ) -> Self {
        Self {
            model: model.name.clone(),
            model_iteration: model.iteration,
            operation: SamplingOperation::Interpolate,
            molecules: molecules.to_vec(),
            num_samples: num_points,
            radius_bits: normalized_bits(radius),
            force_unique: false,
            sanitize: false,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn model_iteration(&self) -> i64 {
        self.model_iteration
    }

    pub fn operation(&self) -> SamplingOperation {
        self.operation
    }

    pub fn molecules(&self) -> &[String] {
        &self.molecules
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn radius(&self) -> f64 {
        f64::from_bits(self.radius_bits)
    }

    pub fn force_unique(&self) -> bool {
        self.force_unique
    }

    pub fn sanitize(&self) -> bool {
        self.sanitize
    }
}

/// Identifies one embedding request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmbeddingKey {
    model: String,
    model_iteration: i64,
    molecule: String,
    max_len: usize,
}

impl EmbeddingKey {
    pub fn new(model: &ModelIdentity, molecule: &str, max_len: usize) -> Self {
        Self {
            model: model.name.clone(),
            model_iteration: model.iteration,
            molecule: molecule.to_string(),
            max_len,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn model_iteration(&self) -> i64 {
        self.model_iteration
    }

    pub fn molecule(&self) -> &str {
        &self.molecule
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(radius: f64) -> SamplingParams {
        SamplingParams {
            num_samples: 3,
            radius,
            force_unique: false,
            sanitize: false,
        }
    }

    #[test]
    fn keys_differ_by_model_iteration() {
        let old = ModelIdentity::new("MegaMolBART", 1);
        let new = ModelIdentity::new("MegaMolBART", 2);
        assert_ne!(
            SamplingKey::find_similar(&old, "CCO", &params(0.1)),
            SamplingKey::find_similar(&new, "CCO", &params(0.1))
        );
        assert_ne!(EmbeddingKey::new(&old, "CCO", 64), EmbeddingKey::new(&new, "CCO", 64));
    }

    #[test]
    fn radius_compares_by_bit_pattern() {
        let model = ModelIdentity::new("CDDD", 0);
        let a = SamplingKey::find_similar(&model, "CCO", &params(0.1));
        let b = SamplingKey::find_similar(&model, "CCO", &params(1.0 / 10.0));
        let c = SamplingKey::find_similar(&model, "CCO", &params(0.1000001));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.radius(), 0.1);
    }

    #[test]
    fn negative_zero_radius_matches_zero() {
        let model = ModelIdentity::new("CDDD", 0);
        assert_eq!(
            SamplingKey::find_similar(&model, "CCO", &params(-0.0)),
            SamplingKey::find_similar(&model, "CCO", &params(0.0))
        );
    }

    #[test]
    fn find_similar_and_interpolate_never_collide() {
        let model = ModelIdentity::new("CDDD", 0);
        let similar = SamplingKey::find_similar(&model, "CCO", &params(0.0));
        let interp = SamplingKey::interpolate(&model, &["CCO".to_string()], 3, 0.0);
        assert_ne!(similar, interp);
        assert_eq!(interp.operation(), SamplingOperation::Interpolate);
    }
}
