use super::RegressionError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// K-fold cross-validation splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for KFold {
    fn default() -> Self {
        Self {
            n_splits: 4,
            shuffle: true,
            seed: 0,
        }
    }
}

impl KFold {
    pub fn new(n_splits: usize, shuffle: bool, seed: u64) -> Self {
        Self {
            n_splits,
            shuffle,
            seed,
        }
    }

    /// Returns `(train, test)` index pairs, both sorted ascending.
    ///
    /// The first `n_samples % n_splits` folds hold one extra sample.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, RegressionError> {
        if self.n_splits < 2 || self.n_splits > n_samples {
            return Err(RegressionError::InvalidFolds {
                n_splits: self.n_splits,
                n_samples,
            });
        }
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let mut in_test = vec![false; n_samples];
            for &idx in &indices[start..start + size] {
                in_test[idx] = true;
            }
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..n_samples).partition(|&idx| in_test[idx]);
            folds.push((train, test));
            start += size;
        }
        Ok(folds)
    }
}
