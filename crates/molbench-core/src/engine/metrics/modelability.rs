use super::MetricError;
use crate::core::models::dataset::Dataset;
use crate::core::models::record::{MetricOutcome, MetricValue, Predictions};
use crate::core::regression::{
    EstimatorFamily, GridSearch, GridSearchOutcome, Hyperparameters, KFold, ParamGrid,
    RegressionError,
};
use crate::core::stats::StandardScaler;
use crate::engine::config::ModelabilityConfig;
use crate::engine::context::BenchmarkContext;
use crate::engine::progress::Progress;
use nalgebra::{DMatrix, DVector};
use tracing::{info, instrument};

pub const METRIC_NAME: &str = "modelability";

/// Best cross-validated fits of one estimator family on both representations.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub embedding: GridSearchOutcome,
    pub fingerprint: GridSearchOutcome,
}

impl Comparison {
    /// Fingerprint error over embedding error; above one means the embedding
    /// is easier to model.
    pub fn ratio(&self) -> f64 {
        self.fingerprint.best_score / self.embedding.best_score
    }
}

fn to_matrix(rows: &[Vec<f64>]) -> DMatrix<f64> {
    let width = rows.first().map_or(0, Vec::len);
    DMatrix::from_fn(rows.len(), width, |i, j| rows[i][j])
}

fn format_params(params: &Hyperparameters) -> String {
    serde_json::to_string(params).unwrap_or_default()
}

fn search_rows(
    search: &GridSearch<'_>,
    rows: &[Vec<f64>],
    y: &DVector<f64>,
    target_scaler: Option<&StandardScaler>,
    on_combination: &mut dyn FnMut(&Hyperparameters, f64),
) -> Result<GridSearchOutcome, MetricError> {
    let mut outcome = search
        .run(&to_matrix(rows), y, on_combination)
        .map_err(|e| match e {
            RegressionError::AllCombinationsFailed(combinations) => {
                MetricError::AllCombinationsFailed {
                    family: search.family,
                    combinations,
                }
            }
            other => MetricError::Regression(other),
        })?;
    if let (Some(scaler), Some(predictions)) = (target_scaler, outcome.predictions.as_mut()) {
        *predictions = scaler.inverse_transform_column(predictions);
    }
    Ok(outcome)
}

/// Grid-searches `family` on embedding features and on fingerprint features
/// against the same target.
///
/// Scaling is fitted on the rows given here. Scores are reported in the
/// (possibly scaled) target space; retained predictions are mapped back to
/// property units.
pub fn compare_representations(
    family: EstimatorFamily,
    grid: &ParamGrid,
    config: &ModelabilityConfig,
    embeddings: &[Vec<f64>],
    fingerprints: &[Vec<f64>],
    target: &[f64],
    mut on_combination: impl FnMut(&Hyperparameters, f64),
) -> Result<Comparison, MetricError> {
    let embeddings = if config.normalize_features {
        StandardScaler::fit(embeddings).transform(embeddings)
    } else {
        embeddings.to_vec()
    };
    let target_scaler = config
        .normalize_target
        .then(|| StandardScaler::fit_column(target));
    let y = match &target_scaler {
        Some(scaler) => scaler.transform_column(target),
        None => target.to_vec(),
    };
    let y = DVector::from_vec(y);

    let search = GridSearch {
        family,
        grid,
        folds: KFold {
            n_splits: config.n_splits,
            shuffle: true,
            seed: config.seed,
        },
        seed: config.seed,
        retain_predictions: config.retain_predictions,
    };
    let scaler = target_scaler.as_ref();
    let embedding = search_rows(&search, &embeddings, &y, scaler, &mut on_combination)?;
    let fingerprint = search_rows(&search, fingerprints, &y, scaler, &mut on_combination)?;
    Ok(Comparison {
        embedding,
        fingerprint,
    })
}

/// How much easier the dataset's property is to regress from embeddings than
/// from fingerprints, for one estimator family.
#[instrument(skip_all, name = "modelability", fields(dataset = dataset.name(), model = %family))]
pub fn run(
    context: &BenchmarkContext,
    dataset: &Dataset,
    family: EstimatorFamily,
    grid: &ParamGrid,
    config: &ModelabilityConfig,
) -> Result<MetricOutcome, MetricError> {
    let property = dataset.single_property().ok_or_else(|| MetricError::PropertyColumns {
        dataset: dataset.name().to_string(),
        found: dataset.properties().len(),
    })?;
    if dataset.is_empty() {
        return Err(MetricError::EmptyDataset(dataset.name().to_string()));
    }

    let reporter = context.reporter;
    reporter.report(Progress::Message(format!("Embedding {} molecules", dataset.len())));
    let mut embeddings: Vec<Vec<f64>> = Vec::with_capacity(dataset.len());
    for molecule in dataset.smiles() {
        let features = context
            .inference
            .embed(molecule, dataset.max_seq_len())?
            .token_average(molecule.len());
        if let Some(first) = embeddings.first() {
            if first.len() != features.len() {
                return Err(MetricError::EmbeddingLength {
                    molecule: molecule.clone(),
                    expected: first.len(),
                    found: features.len(),
                });
            }
        }
        embeddings.push(features);
    }
    let fingerprints: Vec<Vec<f64>> = dataset.fingerprints().iter().map(|fp| fp.to_f64_vec()).collect();

    reporter.task(2 * grid.combinations().len());
    let comparison = compare_representations(
        family,
        grid,
        config,
        &embeddings,
        &fingerprints,
        &property.values,
        |_, _| reporter.report(Progress::TaskIncrement),
    )?;
    reporter.report(Progress::TaskFinish);

    let ratio = comparison.ratio();
    info!(
        ratio,
        embedding_error = comparison.embedding.best_score,
        fingerprint_error = comparison.fingerprint.best_score,
        "Computed modelability."
    );

    let mut outcome = MetricOutcome::new(METRIC_NAME, MetricValue::Scalar(ratio))
        .with_param("model", family.name())
        .with_param("property", property.name.as_str())
        .with_param("n_splits", config.n_splits)
        .with_param("fingerprint_error", comparison.fingerprint.best_score)
        .with_param("embedding_error", comparison.embedding.best_score)
        .with_param("fingerprint_params", format_params(&comparison.fingerprint.best_params))
        .with_param("embedding_params", format_params(&comparison.embedding.best_params));
    if let (Some(embedding), Some(fingerprint)) =
        (comparison.embedding.predictions, comparison.fingerprint.predictions)
    {
        outcome.predictions = Some(Predictions {
            embedding,
            fingerprint,
        });
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::SmilesSyntaxValidator;
    use crate::core::models::dataset::PropertyColumn;
    use crate::core::models::fingerprint::Fingerprint;
    use crate::engine::backend::SerialBackend;
    use crate::engine::cache::MemoryCache;
    use crate::engine::config::ModelabilityConfigBuilder;
    use crate::engine::inference::CachedInference;
    use crate::engine::inference::testing::ScriptedClient;
    use crate::engine::progress::ProgressReporter;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn config(retain: bool) -> ModelabilityConfig {
        ModelabilityConfigBuilder::new()
            .n_splits(4)
            .seed(0)
            .retain_predictions(retain)
            .build()
            .unwrap()
    }

    fn linear_problem() -> (Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(11);
        let embeddings: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, ((i * 7) % 11) as f64])
            .collect();
        let fingerprints: Vec<Vec<f64>> = (0..40)
            .map(|_| (0..8).map(|_| rng.gen_range(0..2) as f64).collect())
            .collect();
        let target = embeddings.iter().map(|e| 3.0 * e[0] - e[1] + 1.0).collect();
        (embeddings, fingerprints, target)
    }

    #[test]
    fn linear_embeddings_beat_random_fingerprints() {
        let (embeddings, fingerprints, target) = linear_problem();
        let comparison = compare_representations(
            EstimatorFamily::LinearRegression,
            &ParamGrid::new(),
            &config(false),
            &embeddings,
            &fingerprints,
            &target,
            |_, _| {},
        )
        .unwrap();
        assert!(comparison.embedding.best_score < 1e-12);
        assert!(comparison.fingerprint.best_score > 1.0);
        assert!(comparison.ratio() > 1e3);
    }

    #[test]
    fn retained_predictions_are_in_property_units() {
        let (embeddings, fingerprints, target) = linear_problem();
        let mut config = config(true);
        config.normalize_target = true;
        config.normalize_features = true;
        let comparison = compare_representations(
            EstimatorFamily::LinearRegression,
            &ParamGrid::new(),
            &config,
            &embeddings,
            &fingerprints,
            &target,
            |_, _| {},
        )
        .unwrap();
        let predictions = comparison.embedding.predictions.unwrap();
        assert_eq!(predictions.len(), target.len());
        for (p, t) in predictions.iter().zip(&target) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn every_combination_is_reported_for_both_representations() {
        let (embeddings, fingerprints, target) = linear_problem();
        let grid = ParamGrid::new().with("alpha", vec![0.01, 0.1]).with("l1_ratio", vec![0.5]);
        let mut seen = 0;
        compare_representations(
            EstimatorFamily::ElasticNet,
            &grid,
            &config(false),
            &embeddings,
            &fingerprints,
            &target,
            |_, _| seen += 1,
        )
        .unwrap();
        assert_eq!(seen, 4);
    }

    #[test]
    fn failing_grid_maps_to_metric_error() {
        let (embeddings, fingerprints, target) = linear_problem();
        let grid = ParamGrid::new().with("alpha", vec![-1.0]).with("l1_ratio", vec![0.5]);
        let err = compare_representations(
            EstimatorFamily::ElasticNet,
            &grid,
            &config(false),
            &embeddings,
            &fingerprints,
            &target,
            |_, _| {},
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MetricError::AllCombinationsFailed { family: EstimatorFamily::ElasticNet, combinations: 1 }
        ));
    }

    fn dataset(properties: Vec<PropertyColumn>) -> Dataset {
        let smiles: Vec<String> = ["CCO", "CCN", "CCCC", "CO", "CN", "CCCO", "OCCO", "NCCN"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let fingerprints = (0..smiles.len())
            .map(|i| Fingerprint::from_bits(16, [i % 16, (i * 3) % 16]))
            .collect();
        Dataset::new("props", smiles, fingerprints, properties, None).unwrap()
    }

    #[test]
    fn run_records_errors_params_and_predictions() {
        let client = ScriptedClient::new("CDDD", 2);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);
        let logp = PropertyColumn {
            name: "logP".to_string(),
            values: (0..8).map(|i| i as f64 * 0.5).collect(),
        };

        let outcome = run(
            &context,
            &dataset(vec![logp]),
            EstimatorFamily::LinearRegression,
            &ParamGrid::new(),
            &config(true),
        )
        .unwrap();
        assert_eq!(outcome.name, "modelability");
        assert_eq!(outcome.params["model"].to_string(), "linear_regression");
        assert_eq!(outcome.params["property"].to_string(), "logP");
        assert!(outcome.params.contains_key("fingerprint_error"));
        assert!(outcome.params.contains_key("embedding_error"));
        let predictions = outcome.predictions.unwrap();
        assert_eq!(predictions.embedding.len(), 8);
        assert_eq!(predictions.fingerprint.len(), 8);
    }

    #[test]
    fn run_requires_a_single_property() {
        let client = ScriptedClient::new("CDDD", 2);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);
        let err = run(
            &context,
            &dataset(Vec::new()),
            EstimatorFamily::LinearRegression,
            &ParamGrid::new(),
            &config(false),
        )
        .unwrap_err();
        assert!(matches!(err, MetricError::PropertyColumns { found: 0, .. }));
        assert_eq!(client.embed_calls(), 0);
    }
}
