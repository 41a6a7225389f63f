use super::MetricError;
use crate::core::models::dataset::Dataset;
use crate::core::models::record::{MetricOutcome, MetricValue};
use crate::engine::context::BenchmarkContext;
use crate::engine::inference::SamplingParams;
use crate::engine::progress::Progress;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, instrument};

/// Metrics computed from molecules sampled around each dataset molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingMetric {
    /// Fraction of generated molecules that are chemically valid.
    Validity,
    /// Fraction of distinct generated molecules per input.
    Uniqueness,
    /// Fraction of generated molecules found in the training set.
    Novelty,
}

impl SamplingMetric {
    pub fn name(&self) -> &'static str {
        match self {
            SamplingMetric::Validity => "validity",
            SamplingMetric::Uniqueness => "unique",
            SamplingMetric::Novelty => "novelty",
        }
    }

    fn count(&self, context: &BenchmarkContext, candidates: &[String]) -> Result<usize, MetricError> {
        Ok(match self {
            SamplingMetric::Validity => candidates
                .iter()
                .filter(|c| context.validator.is_valid(c))
                .count(),
            SamplingMetric::Uniqueness => candidates.iter().collect::<HashSet<_>>().len(),
            SamplingMetric::Novelty => {
                let training_set = context.training_set.ok_or(MetricError::MissingTrainingSet)?;
                candidates.iter().filter(|c| training_set.contains(c)).count()
            }
        })
    }
}

impl fmt::Display for SamplingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Samples `num_samples` molecules around every dataset molecule at `radius` and
/// returns `sum(counts) / (dataset_size * num_samples)`.
#[instrument(skip_all, name = "sampling_metric", fields(metric = %metric, dataset = dataset.name(), radius = radius, num_samples = num_samples))]
pub fn run(
    context: &BenchmarkContext,
    metric: SamplingMetric,
    dataset: &Dataset,
    num_samples: usize,
    radius: f64,
) -> Result<MetricOutcome, MetricError> {
    if num_samples == 0 || dataset.is_empty() {
        return Err(MetricError::ZeroDenominator {
            molecules: dataset.len(),
            num_samples,
        });
    }
    if metric == SamplingMetric::Novelty && context.training_set.is_none() {
        return Err(MetricError::MissingTrainingSet);
    }

    let params = SamplingParams::new(num_samples, radius);
    let reporter = context.reporter;
    reporter.task(dataset.len());
    let mut total = 0usize;
    for molecule in dataset.smiles() {
        let sample = context.inference.find_similar(molecule, &params)?;
        let candidates = sample.candidates();
        let candidates = &candidates[..candidates.len().min(num_samples)];
        total += metric.count(context, candidates)?;
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let value = total as f64 / (dataset.len() * num_samples) as f64;
    info!(value, "Computed sampling metric.");
    Ok(MetricOutcome::new(metric.name(), MetricValue::Scalar(value))
        .with_param("radius", radius)
        .with_param("num_samples", num_samples))
}
