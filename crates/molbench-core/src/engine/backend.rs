use crate::core::models::fingerprint::Fingerprint;
use crate::engine::config::ConfigError;
use nalgebra::DMatrix;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Computes the pairwise distance matrices the embedding metrics need.
pub trait DistanceBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Euclidean distances between equally sized row vectors.
    fn pairwise_euclidean(&self, rows: &[Vec<f64>]) -> DMatrix<f64>;

    /// Tanimoto (Jaccard) distances between fingerprints.
    fn pairwise_tanimoto(&self, fingerprints: &[Fingerprint]) -> DMatrix<f64>;
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

fn from_upper_rows(n: usize, rows: Vec<Vec<f64>>) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(n, n);
    for (i, row) in rows.into_iter().enumerate() {
        for (offset, d) in row.into_iter().enumerate() {
            let j = i + 1 + offset;
            matrix[(i, j)] = d;
            matrix[(j, i)] = d;
        }
    }
    matrix
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl DistanceBackend for SerialBackend {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn pairwise_euclidean(&self, rows: &[Vec<f64>]) -> DMatrix<f64> {
        let n = rows.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .map(|i| (i + 1..n).map(|j| euclidean(&rows[i], &rows[j])).collect())
            .collect();
        from_upper_rows(n, upper)
    }

    fn pairwise_tanimoto(&self, fingerprints: &[Fingerprint]) -> DMatrix<f64> {
        let n = fingerprints.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (i + 1..n)
                    .map(|j| fingerprints[i].tanimoto_distance(&fingerprints[j]))
                    .collect()
            })
            .collect();
        from_upper_rows(n, upper)
    }
}

/// Row-parallel distance computation on the rayon thread pool.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelBackend;

#[cfg(feature = "parallel")]
impl DistanceBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn pairwise_euclidean(&self, rows: &[Vec<f64>]) -> DMatrix<f64> {
        let n = rows.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (i + 1..n).map(|j| euclidean(&rows[i], &rows[j])).collect())
            .collect();
        from_upper_rows(n, upper)
    }

    fn pairwise_tanimoto(&self, fingerprints: &[Fingerprint]) -> DMatrix<f64> {
        let n = fingerprints.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i + 1..n)
                    .map(|j| fingerprints[i].tanimoto_distance(&fingerprints[j]))
                    .collect()
            })
            .collect();
        from_upper_rows(n, upper)
    }
}

/// Which [`DistanceBackend`] to use, chosen from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Serial,
    Parallel,
}

impl BackendKind {
    pub fn build(&self) -> Result<Box<dyn DistanceBackend>, ConfigError> {
        match self {
            BackendKind::Serial => Ok(Box::new(SerialBackend)),
            #[cfg(feature = "parallel")]
            BackendKind::Parallel => Ok(Box::new(ParallelBackend)),
            #[cfg(not(feature = "parallel"))]
            BackendKind::Parallel => Err(ConfigError::Unsupported(
                "the parallel backend requires the 'parallel' feature".to_string(),
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Serial => f.write_str("serial"),
            BackendKind::Parallel => f.write_str("parallel"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" | "cpu" => Ok(BackendKind::Serial),
            "parallel" => Ok(BackendKind::Parallel),
            _ => Err(ConfigError::InvalidValue {
                key: "backend",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<f64>> {
        vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![6.0, 8.0]]
    }

    fn fingerprints() -> Vec<Fingerprint> {
        vec![
            Fingerprint::from_bits(16, [0, 1, 2]),
            Fingerprint::from_bits(16, [1, 2, 3]),
            Fingerprint::from_bits(16, [8]),
        ]
    }

    #[test]
    fn serial_euclidean_is_symmetric_with_zero_diagonal() {
        let d = SerialBackend.pairwise_euclidean(&rows());
        assert_eq!(d[(0, 1)], 5.0);
        assert_eq!(d[(2, 0)], 10.0);
        assert_eq!(d[(1, 1)], 0.0);
        assert_eq!(d, d.transpose());
    }

    #[test]
    fn serial_tanimoto_matches_fingerprint_distance() {
        let d = SerialBackend.pairwise_tanimoto(&fingerprints());
        assert!((d[(0, 1)] - 0.5).abs() < 1e-12);
        assert_eq!(d[(0, 2)], 1.0);
        assert_eq!(d[(2, 2)], 0.0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_serial() {
        assert_eq!(
            ParallelBackend.pairwise_euclidean(&rows()),
            SerialBackend.pairwise_euclidean(&rows())
        );
        assert_eq!(
            ParallelBackend.pairwise_tanimoto(&fingerprints()),
            SerialBackend.pairwise_tanimoto(&fingerprints())
        );
    }

    #[test]
    fn backend_kind_parses_and_builds() {
        assert_eq!("serial".parse::<BackendKind>().unwrap(), BackendKind::Serial);
        assert!("gpu".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Serial.build().unwrap().name(), "serial");
        #[cfg(feature = "parallel")]
        assert_eq!(BackendKind::Parallel.build().unwrap().name(), "parallel");
        #[cfg(not(feature = "parallel"))]
        assert!(BackendKind::Parallel.build().is_err());
    }
}
