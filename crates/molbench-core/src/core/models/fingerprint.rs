use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// A fixed-width chemical fingerprint stored as packed 64-bit words.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    words: Vec<u64>,
    n_bits: usize,
}

impl Fingerprint {
    pub fn zeros(n_bits: usize) -> Self {
        Self {
            words: vec![0; n_bits.div_ceil(WORD_BITS)],
            n_bits,
        }
    }

    /// Builds a fingerprint of width `n_bits` with the given bit positions set.
    ///
    /// Positions outside the width are ignored.
    pub fn from_bits(n_bits: usize, bits: impl IntoIterator<Item = usize>) -> Self {
        let mut fp = Self::zeros(n_bits);
        for bit in bits {
            fp.set(bit);
        }
        fp
    }

    pub fn set(&mut self, bit: usize) {
        if bit < self.n_bits {
            self.words[bit / WORD_BITS] |= 1u64 << (bit % WORD_BITS);
        }
    }

    pub fn get(&self, bit: usize) -> bool {
        bit < self.n_bits && (self.words[bit / WORD_BITS] >> (bit % WORD_BITS)) & 1 == 1
    }

    pub fn n_bits(&self) -> usize {
        self.n_bits
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn intersection_count(&self, other: &Fingerprint) -> u32 {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones())
            .sum()
    }

    pub fn union_count(&self, other: &Fingerprint) -> u32 {
        let shared: u32 = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a | b).count_ones())
            .sum();
        // Trailing words of the wider fingerprint, if widths ever differ.
        let (longer, shorter) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };
        shared
            + longer.words[shorter.words.len()..]
                .iter()
                .map(|w| w.count_ones())
                .sum::<u32>()
    }

    /// Tanimoto (Jaccard) similarity. Two empty fingerprints are considered identical.
    pub fn tanimoto_similarity(&self, other: &Fingerprint) -> f64 {
        let union = self.union_count(other);
        if union == 0 {
            return 1.0;
        }
        self.intersection_count(other) as f64 / union as f64
    }

    pub fn tanimoto_distance(&self, other: &Fingerprint) -> f64 {
        1.0 - self.tanimoto_similarity(other)
    }

    /// Bits as a `0.0`/`1.0` feature vector.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.n_bits)
            .map(|bit| if self.get(bit) { 1.0 } else { 0.0 })
            .collect()
    }
}
