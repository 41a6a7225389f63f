use super::ModelError;
use serde::{Deserialize, Serialize};

/// A dense embedding tensor produced by a generative model for one molecule.
///
/// The values are stored flat in row-major order; `shape` describes how they are laid
/// out (typically `[sequence_length, hidden_size]`, sometimes with leading unit axes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEmbedding")]
pub struct Embedding {
    values: Vec<f32>,
    shape: Vec<usize>,
}

#[derive(Deserialize)]
struct RawEmbedding {
    values: Vec<f32>,
    shape: Vec<usize>,
}

impl TryFrom<RawEmbedding> for Embedding {
    type Error = ModelError;

    fn try_from(raw: RawEmbedding) -> Result<Self, Self::Error> {
        Self::new(raw.values, raw.shape)
    }
}

impl Embedding {
    pub fn new(values: Vec<f32>, shape: Vec<usize>) -> Result<Self, ModelError> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != values.len() {
            return Err(ModelError::ShapeMismatch {
                shape,
                len: values.len(),
            });
        }
        Ok(Self { values, shape })
    }

    pub fn flat(values: Vec<f32>) -> Self {
        let shape = vec![values.len()];
        Self { values, shape }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shape with unit axes removed; a fully-unit shape collapses to `[1]`.
    fn squeezed_shape(&self) -> Vec<usize> {
        let squeezed: Vec<usize> = self.shape.iter().copied().filter(|&d| d != 1).collect();
        if squeezed.is_empty() {
            vec![self.values.len()]
        } else {
            squeezed
        }
    }

    /// Number of sequence positions and the width of each position.
    fn rows_and_width(&self) -> (usize, usize) {
        let shape = self.squeezed_shape();
        if shape.len() == 1 {
            (shape[0], 1)
        } else {
            let width: usize = shape[1..].iter().product();
            (shape[0], width)
        }
    }

    /// Flattens the embedding after zeroing every sequence position at or beyond
    /// `sequence_len`.
    pub fn zero_padded_flat(&self, sequence_len: usize) -> Vec<f64> {
        let (rows, width) = self.rows_and_width();
        let keep = sequence_len.min(rows) * width;
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| if i < keep { v as f64 } else { 0.0 })
            .collect()
    }

    /// Averages the first `sequence_len` token rows into a single vector.
    ///
    /// One-dimensional embeddings have no token axis and are returned unchanged.
    pub fn token_average(&self, sequence_len: usize) -> Vec<f64> {
        let shape = self.squeezed_shape();
        if shape.len() == 1 {
            return self.values.iter().map(|&v| v as f64).collect();
        }
        let (rows, width) = self.rows_and_width();
        let used = sequence_len.min(rows);
        let mut mean = vec![0.0; width];
        if used == 0 {
            return mean;
        }
        for row in self.values.chunks(width).take(used) {
            for (acc, &v) in mean.iter_mut().zip(row) {
                *acc += v as f64;
            }
        }
        for acc in mean.iter_mut() {
            *acc /= used as f64;
        }
        mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_three() -> Embedding {
        Embedding::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap()
    }

    #[test]
    fn decoding_rejects_inconsistent_shape() {
        let bytes = bincode::serialize(&(vec![1.0f32, 2.0, 3.0], vec![2usize, 2])).unwrap();
        assert!(bincode::deserialize::<Embedding>(&bytes).is_err());
        let bytes = bincode::serialize(&two_by_three()).unwrap();
        assert_eq!(bincode::deserialize::<Embedding>(&bytes).unwrap(), two_by_three());
    }

    #[test]
    fn new_rejects_inconsistent_shape() {
        let result = Embedding::new(vec![1.0, 2.0, 3.0], vec![2, 2]);
        assert!(matches!(result, Err(ModelError::ShapeMismatch { len: 3, .. })));
    }

    #[test]
    fn zero_padded_flat_zeroes_positions_past_sequence_length() {
        let flat = two_by_three().zero_padded_flat(1);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_padded_flat_keeps_everything_for_long_sequences() {
        let flat = two_by_three().zero_padded_flat(10);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn zero_padded_flat_ignores_leading_unit_axes() {
        let embedding =
            Embedding::new(vec![1.0, 2.0, 3.0, 4.0], vec![1, 2, 2]).unwrap();
        assert_eq!(embedding.zero_padded_flat(1), vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn token_average_means_over_used_rows() {
        let mean = two_by_three().token_average(2);
        assert_eq!(mean, vec![2.5, 3.5, 4.5]);
        let first = two_by_three().token_average(1);
        assert_eq!(first, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn token_average_of_flat_embedding_is_identity() {
        let embedding = Embedding::flat(vec![0.5, -1.0]);
        assert_eq!(embedding.token_average(1), vec![0.5, -1.0]);
    }
}
