use crate::engine::config::{BenchmarkPlan, ConfigError};
use crate::engine::context::BenchmarkContext;
use crate::engine::error::EngineError;
use crate::engine::inference::SamplingParams;
use crate::engine::metrics::registry::MetricSpec;
use crate::engine::progress::Progress;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Number of distinct inference requests walked while warming a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarmSummary {
    pub samples: usize,
    pub embeddings: usize,
}

#[derive(Default)]
struct DatasetRequests {
    sampling: Vec<SamplingParams>,
    embed: bool,
}

impl DatasetRequests {
    fn add_sampling(&mut self, params: SamplingParams) {
        let seen = self.sampling.iter().any(|p| {
            p.num_samples == params.num_samples && p.radius.to_bits() == params.radius.to_bits()
        });
        if !seen {
            self.sampling.push(params);
        }
    }
}

fn collect_requests(plan: &BenchmarkPlan) -> BTreeMap<&str, DatasetRequests> {
    let mut requests: BTreeMap<&str, DatasetRequests> = BTreeMap::new();
    for job in &plan.jobs {
        let entry = requests.entry(job.dataset.as_str()).or_default();
        match &job.spec {
            MetricSpec::Sampling {
                num_samples, radii, ..
            } => {
                for &radius in radii {
                    entry.add_sampling(SamplingParams::new(*num_samples, radius));
                }
            }
            MetricSpec::NearestNeighbor { .. } | MetricSpec::Modelability { .. } => {
                entry.embed = true;
            }
        }
    }
    requests
}

/// Issues every sampling and embedding request the jobs of `plan` will make, so a
/// later benchmark run over the same plan is served entirely from the cache.
///
/// Requests shared by several metrics are issued once per dataset.
#[instrument(skip_all, name = "cache_warm", fields(jobs = plan.jobs.len()))]
pub fn run(context: &BenchmarkContext, plan: &BenchmarkPlan) -> Result<WarmSummary, EngineError> {
    let reporter = context.reporter;
    let mut summary = WarmSummary::default();

    for (name, requests) in collect_requests(plan) {
        let dataset = plan.dataset(name).ok_or_else(|| ConfigError::UnknownDataset {
            metric: "cache warm".to_string(),
            dataset: name.to_string(),
        })?;
        reporter.phase(format!("Warming cache for {}", name));
        let per_molecule = requests.sampling.len() + usize::from(requests.embed);
        reporter.task(dataset.len() * per_molecule);

        for molecule in dataset.smiles() {
            for params in &requests.sampling {
                context.inference.find_similar(molecule, params)?;
                summary.samples += 1;
                reporter.report(Progress::TaskIncrement);
            }
            if requests.embed {
                context.inference.embed(molecule, dataset.max_seq_len())?;
                summary.embeddings += 1;
                reporter.report(Progress::TaskIncrement);
            }
        }
        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);
        info!(
            dataset = name,
            sampling_settings = requests.sampling.len(),
            embeddings = requests.embed,
            "Warmed cache for dataset."
        );
    }

    info!(samples = summary.samples, embeddings = summary.embeddings, "Cache warm complete.");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::{MoleculeValidator, SmilesSyntaxValidator};
    use crate::core::io::sink::MemorySink;
    use crate::core::models::dataset::{Dataset, PropertyColumn};
    use crate::core::regression::{EstimatorFamily, ParamGrid};
    use crate::engine::backend::SerialBackend;
    use crate::engine::cache::{MemoryCache, ResultCache};
    use crate::engine::config::{BenchmarkPlanBuilder, ModelabilityConfigBuilder};
    use crate::engine::inference::CachedInference;
    use crate::engine::inference::testing::ScriptedClient;
    use crate::engine::metrics::registry::MetricKind;
    use crate::engine::metrics::sampling::SamplingMetric;
    use crate::engine::progress::ProgressReporter;
    use crate::workflows::benchmark;

    const MOLECULES: [&str; 6] = ["CCO", "CCN", "CCC", "CO", "CN", "CCCC"];

    fn dataset() -> Dataset {
        let validator = SmilesSyntaxValidator::default();
        let smiles: Vec<String> = MOLECULES.iter().map(|s| s.to_string()).collect();
        let fingerprints = smiles.iter().map(|s| validator.validate(s).fingerprint).collect();
        let property = PropertyColumn {
            name: "logP".to_string(),
            values: vec![0.1, 0.3, 0.2, 0.5, 0.4, 0.9],
        };
        Dataset::new("small", smiles, fingerprints, vec![property], None).unwrap()
    }

    fn sampled(metric: SamplingMetric, radii: Vec<f64>) -> MetricSpec {
        MetricSpec::Sampling {
            metric,
            num_samples: 2,
            radii,
        }
    }

    fn plan() -> BenchmarkPlan {
        let modelability = MetricSpec::Modelability {
            families: vec![(EstimatorFamily::LinearRegression, ParamGrid::new())],
            config: ModelabilityConfigBuilder::new().n_splits(2).seed(0).build().unwrap(),
        };
        BenchmarkPlanBuilder::new()
            .dataset(dataset())
            .job(sampled(SamplingMetric::Validity, vec![0.5, 1.0]), "small")
            .job(sampled(SamplingMetric::Uniqueness, vec![1.0]), "small")
            .job(MetricKind::NearestNeighborCorrelation.default_spec(), "small")
            .job(modelability, "small")
            .build()
            .unwrap()
    }

    #[test]
    fn shared_requests_are_issued_once() {
        let client = ScriptedClient::new("CDDD", 1);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);

        let summary = run(&context, &plan()).unwrap();

        assert_eq!(
            summary,
            WarmSummary {
                samples: 2 * MOLECULES.len(),
                embeddings: MOLECULES.len(),
            }
        );
        assert_eq!(client.sample_calls(), 2 * MOLECULES.len());
        assert_eq!(client.embed_calls(), MOLECULES.len());
        assert_eq!(cache.stats().samples, 2 * MOLECULES.len());
        assert_eq!(cache.stats().embeddings, MOLECULES.len());
    }

    #[test]
    fn benchmark_after_warm_makes_no_client_calls() {
        let client = ScriptedClient::new("CDDD", 1);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);
        let plan = plan();

        run(&context, &plan).unwrap();
        let samples_after_warm = client.sample_calls();
        let embeds_after_warm = client.embed_calls();

        let mut sink = MemorySink::new();
        let records = benchmark::run(&context, &plan, &mut sink, None).unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(client.sample_calls(), samples_after_warm);
        assert_eq!(client.embed_calls(), embeds_after_warm);
    }

    #[test]
    fn warming_twice_is_served_from_cache() {
        let client = ScriptedClient::new("CDDD", 1);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);
        let plan = plan();

        run(&context, &plan).unwrap();
        let calls = (client.sample_calls(), client.embed_calls());
        let again = run(&context, &plan).unwrap();

        assert_eq!(again.samples, 2 * MOLECULES.len());
        assert_eq!((client.sample_calls(), client.embed_calls()), calls);
    }
}
