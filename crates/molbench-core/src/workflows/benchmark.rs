use crate::core::io::sink::RecordSink;
use crate::core::models::record::MetricRecord;
use crate::engine::config::{BenchmarkPlan, ConfigError};
use crate::engine::context::BenchmarkContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use chrono::Local;
use std::time::Instant;
use tracing::{info, instrument};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Runs every job of `plan` and returns the produced records in evaluation order.
///
/// Each record is appended to `metrics_sink` without predictions as soon as it is
/// computed. Records carrying retained predictions are also appended, in full,
/// to `predictions_sink` when one is given. All records of a run share one
/// timestamp. The first failing variation aborts the run.
#[instrument(skip_all, name = "benchmark_workflow", fields(jobs = plan.jobs.len()))]
pub fn run(
    context: &BenchmarkContext,
    plan: &BenchmarkPlan,
    metrics_sink: &mut dyn RecordSink,
    mut predictions_sink: Option<&mut dyn RecordSink>,
) -> Result<Vec<MetricRecord>, EngineError> {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let model = context.inference.model();
    let reporter = context.reporter;
    info!(model = %model, timestamp = %timestamp, "Starting benchmark run.");

    let mut records = Vec::new();
    for job in &plan.jobs {
        let dataset = plan
            .dataset(&job.dataset)
            .ok_or_else(|| ConfigError::UnknownDataset {
                metric: job.spec.kind().to_string(),
                dataset: job.dataset.clone(),
            })?;
        reporter.phase(format!("{} on {}", job.spec.kind(), dataset.name()));

        for variation in job.spec.variations() {
            let started = Instant::now();
            let outcome = variation
                .compute(context, dataset)
                .map_err(|source| EngineError::Metric {
                    metric: variation.to_string(),
                    dataset: dataset.name().to_string(),
                    source,
                })?;
            let record = MetricRecord {
                name: outcome.name,
                value: outcome.value,
                params: outcome.params,
                predictions: outcome.predictions,
                model: model.name.clone(),
                iteration: model.iteration,
                run_time_secs: started.elapsed().as_secs_f64(),
                timestamp: timestamp.clone(),
                data_size: dataset.len(),
            };

            metrics_sink.append(&MetricRecord {
                predictions: None,
                ..record.clone()
            })?;
            if record.predictions.is_some() {
                if let Some(sink) = predictions_sink.as_deref_mut() {
                    sink.append(&record)?;
                }
            }
            info!(
                metric = %variation,
                dataset = dataset.name(),
                value = %record.value,
                run_time_secs = record.run_time_secs,
                "Recorded metric."
            );
            records.push(record);
        }
        reporter.report(Progress::PhaseFinish);
    }

    info!(records = records.len(), "Benchmark run complete.");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::{MoleculeValidator, SmilesSyntaxValidator};
    use crate::core::io::sink::MemorySink;
    use crate::core::models::dataset::{Dataset, PropertyColumn};
    use crate::core::regression::{EstimatorFamily, ParamGrid};
    use crate::engine::backend::SerialBackend;
    use crate::engine::cache::MemoryCache;
    use crate::engine::config::{BenchmarkPlanBuilder, ModelabilityConfigBuilder};
    use crate::engine::inference::CachedInference;
    use crate::engine::inference::testing::ScriptedClient;
    use crate::engine::metrics::MetricError;
    use crate::engine::metrics::registry::{MetricKind, MetricSpec};
    use crate::engine::metrics::sampling::SamplingMetric;
    use crate::engine::progress::ProgressReporter;
    use std::sync::Mutex;

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

    fn plan() -> BenchmarkPlan {
        let modelability = MetricSpec::Modelability {
            families: vec![(EstimatorFamily::LinearRegression, ParamGrid::new())],
            config: ModelabilityConfigBuilder::new()
                .n_splits(2)
                .seed(0)
                .retain_predictions(true)
                .build()
                .unwrap(),
        };
        BenchmarkPlanBuilder::new()
            .dataset(dataset())
            .job(
                MetricSpec::Sampling {
                    metric: SamplingMetric::Validity,
                    num_samples: 2,
                    radii: vec![0.5, 1.0],
                },
                "small",
            )
            .job(MetricKind::NearestNeighborCorrelation.default_spec(), "small")
            .job(modelability, "small")
            .build()
            .unwrap()
    }

    #[test]
    fn records_are_stamped_and_streamed_to_sinks() {
        let client = ScriptedClient::new("MegaMolBART", 7);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);
        let mut metrics = MemorySink::new();
        let mut predictions = MemorySink::new();

        let records = run(&context, &plan(), &mut metrics, Some(&mut predictions)).unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            ["validity", "validity", "nearest_neighbor_correlation", "modelability"]
        );
        for record in &records {
            assert_eq!(record.model, "MegaMolBART");
            assert_eq!(record.iteration, 7);
            assert_eq!(record.data_size, MOLECULES.len());
            assert_eq!(record.timestamp.len(), 15);
            assert_eq!(record.timestamp, records[0].timestamp);
        }
        assert_eq!(metrics.records().len(), 4);
        assert!(metrics.records().iter().all(|r| r.predictions.is_none()));
        assert_eq!(predictions.records().len(), 1);
        assert_eq!(predictions.records()[0].name, "modelability");

        drop(reporter);
        assert_eq!(phases.into_inner().unwrap().len(), 3);
    }

    #[test]
    fn failing_metric_aborts_the_run() {
        let client = ScriptedClient::new("CDDD", 0);
        let cache = MemoryCache::new();
        let inference = CachedInference::new(&client, &cache).unwrap();
        let validator = SmilesSyntaxValidator::default();
        let reporter = ProgressReporter::new();
        let context = BenchmarkContext::new(&inference, &validator, &SerialBackend, &reporter);
        let plan = BenchmarkPlanBuilder::new()
            .dataset(dataset())
            .job(MetricKind::Novelty.default_spec(), "small")
            .build()
            .unwrap();
        let mut metrics = MemorySink::new();

        let err = run(&context, &plan, &mut metrics, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Metric { source: MetricError::MissingTrainingSet, .. }
        ));
        assert!(metrics.records().is_empty());
    }
}
