use super::MetricError;
use crate::core::models::dataset::Dataset;
use crate::core::models::record::{MetricOutcome, MetricValue};
use crate::core::stats::{nan_mean, spearman};
use crate::engine::context::BenchmarkContext;
use crate::engine::progress::Progress;
use nalgebra::DMatrix;
use tracing::{info, instrument, warn};

pub const METRIC_NAME: &str = "nearest_neighbor_correlation";

/// Number of neighbours actually used: `None` or `0` means all of them, larger
/// requests are clamped.
pub fn effective_top_k(top_k: Option<usize>, dataset_size: usize) -> usize {
    let all = dataset_size.saturating_sub(1);
    match top_k {
        None | Some(0) => all,
        Some(k) => k.min(all),
    }
}

/// Per-row Spearman correlation between fingerprint and embedding distances.
///
/// For row `i` the diagonal is dropped, the remaining columns are ordered by
/// ascending fingerprint distance (ties keep column order) and only the first
/// `top_k` enter the correlation. Degenerate rows yield `NaN`.
pub fn neighborhood_correlations(
    fingerprint_distances: &DMatrix<f64>,
    embedding_distances: &DMatrix<f64>,
    top_k: usize,
) -> Vec<f64> {
    let n = fingerprint_distances.nrows();
    (0..n)
        .map(|i| {
            let mut neighbours: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            neighbours.sort_by(|&a, &b| {
                fingerprint_distances[(i, a)].total_cmp(&fingerprint_distances[(i, b)])
            });
            neighbours.truncate(top_k);
            let fp: Vec<f64> = neighbours.iter().map(|&j| fingerprint_distances[(i, j)]).collect();
            let emb: Vec<f64> = neighbours.iter().map(|&j| embedding_distances[(i, j)]).collect();
            spearman(&fp, &emb)
        })
        .collect()
}

/// How well distances in embedding space preserve the chemical neighbourhood
/// given by fingerprint Tanimoto distances.
#[instrument(skip_all, name = "nearest_neighbor_correlation", fields(dataset = dataset.name()))]
pub fn run(
    context: &BenchmarkContext,
    dataset: &Dataset,
    top_k: Option<usize>,
) -> Result<MetricOutcome, MetricError> {
    if dataset.is_empty() {
        return Err(MetricError::EmptyDataset(dataset.name().to_string()));
    }
    let top_k = effective_top_k(top_k, dataset.len());

    let reporter = context.reporter;
    reporter.task(dataset.len());
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(dataset.len());
    for molecule in dataset.smiles() {
        let embedding = context.inference.embed(molecule, dataset.max_seq_len())?;
        let flat = embedding.zero_padded_flat(molecule.len());
        if let Some(first) = rows.first() {
            if first.len() != flat.len() {
                return Err(MetricError::EmbeddingLength {
                    molecule: molecule.clone(),
                    expected: first.len(),
                    found: flat.len(),
                });
            }
        }
        rows.push(flat);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let embedding_distances = context.backend.pairwise_euclidean(&rows);
    let fingerprint_distances = context.backend.pairwise_tanimoto(dataset.fingerprints());
    let correlations =
        neighborhood_correlations(&fingerprint_distances, &embedding_distances, top_k);
    let degenerate = correlations.iter().filter(|c| c.is_nan()).count();
    if degenerate > 0 {
        warn!(degenerate, "Excluded rows with undefined rank correlation.");
    }
    let value = nan_mean(&correlations);
    info!(value, top_k, backend = context.backend.name(), "Computed nearest neighbor correlation.");

    Ok(MetricOutcome::new(METRIC_NAME, MetricValue::Scalar(value)).with_param("top_k", top_k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::{MoleculeValidator, SmilesSyntaxValidator};
    use crate::core::models::embedding::Embedding;
    use crate::engine::backend::SerialBackend;
    use crate::engine::cache::MemoryCache;
    use crate::engine::inference::CachedInference;
    use crate::engine::inference::testing::ScriptedClient;
    use crate::engine::progress::ProgressReporter;

    fn symmetric(values: &[&[f64]]) -> DMatrix<f64> {
        let n = values.len();
        DMatrix::from_fn(n, n, |i, j| values[i][j])
    }

    #[test]
    fn identical_orderings_correlate_perfectly() {
        let fp = symmetric(&[&[0.0, 0.1, 0.5, 0.9], &[0.1, 0.0, 0.3, 0.6], &[0.5, 0.3, 0.0, 0.2], &[0.9, 0.6, 0.2, 0.0]]);
        let emb = fp.map(|d| d * 10.0 + d * d);
        let rho = neighborhood_correlations(&fp, &emb, 3);
        assert!(rho.iter().all(|r| (r - 1.0).abs() < 1e-12));

        let reversed = fp.map(|d| 1.0 - d);
        let rho = neighborhood_correlations(&fp, &reversed, 3);
        assert!(rho.iter().all(|r| (r + 1.0).abs() < 1e-12));
    }

    #[test]
    fn constant_fingerprint_distances_are_degenerate() {
        let fp = DMatrix::from_element(4, 4, 1.0);
        let emb = DMatrix::from_fn(4, 4, |i, j| (i + j) as f64);
        let rho = neighborhood_correlations(&fp, &emb, 3);
        assert!(rho.iter().all(|r| r.is_nan()));
        assert!(nan_mean(&rho).is_nan());
    }

    #[test]
    fn top_k_restricts_to_nearest_neighbours() {
        // Nearest two neighbours agree, the farthest disagrees.
        let fp = symmetric(&[&[0.0, 0.1, 0.2, 0.9], &[0.1, 0.0, 0.1, 0.9], &[0.2, 0.1, 0.0, 0.9], &[0.9, 0.9, 0.9, 0.0]]);
        let emb = symmetric(&[&[0.0, 1.0, 2.0, 0.5], &[1.0, 0.0, 1.5, 0.5], &[2.0, 1.5, 0.0, 0.5], &[0.5, 0.5, 0.5, 0.0]]);
        let rho = neighborhood_correlations(&fp, &emb, 2);
        assert!((rho[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn effective_top_k_defaults_and_clamps() {
        assert_eq!(effective_top_k(None, 5), 4);
        assert_eq!(effective_top_k(Some(0), 5), 4);
        assert_eq!(effective_top_k(Some(2), 5), 2);
        assert_eq!(effective_top_k(Some(50), 5), 4);
        assert_eq!(effective_top_k(None, 0), 0);
    }

    fn dataset() -> Dataset {
        let validator = SmilesSyntaxValidator::default();
        let smiles: Vec<String> = ["CCO", "CCN", "CCCC", "c1ccccc1", "CC(=O)O"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let fingerprints = smiles.iter().map(|s| validator.validate(s).fingerprint).collect();
        Dataset::new("five", smiles, fingerprints, Vec::new(), None).unwrap()
    }

    #[test]
    fn run_reports_value_in_range_and_effective_top_k() {
        let client = ScriptedClient::new("CDDD", 0);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);

        let outcome = run(&context, &dataset(), Some(100)).unwrap();
        let value = outcome.value.as_scalar().unwrap();
        assert!(value.is_nan() || (-1.0..=1.0).contains(&value));
        assert_eq!(outcome.params["top_k"].to_string(), "4");
        assert_eq!(client.embed_calls(), 5);
    }

    #[test]
    fn mismatched_embedding_lengths_are_rejected() {
        let client = ScriptedClient::new("CDDD", 0).with_embedding("CCN", Embedding::flat(vec![1.0; 3]));
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);
        assert!(matches!(
            run(&context, &dataset(), None),
            Err(MetricError::EmbeddingLength { .. })
        ));
    }
}
