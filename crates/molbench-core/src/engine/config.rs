use crate::core::models::dataset::Dataset;
use crate::engine::metrics::registry::MetricSpec;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Metric '{metric}' refers to unknown dataset '{dataset}'")]
    UnknownDataset { metric: String, dataset: String },

    #[error("Invalid parameter grid for '{family}': {reason}")]
    InvalidGrid { family: String, reason: String },

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),
}

/// Settings for the modelability metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelabilityConfig {
    pub n_splits: usize,
    pub seed: u64,
    pub retain_predictions: bool,
    /// Z-score embedding features before fitting. Fingerprint bits are left as is.
    pub normalize_features: bool,
    /// Z-score the property; retained predictions are mapped back to property units.
    pub normalize_target: bool,
}

#[derive(Default)]
pub struct ModelabilityConfigBuilder {
    n_splits: Option<usize>,
    seed: Option<u64>,
    retain_predictions: bool,
    normalize_features: bool,
    normalize_target: bool,
}

impl ModelabilityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_splits(mut self, n: usize) -> Self {
        self.n_splits = Some(n);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn retain_predictions(mut self, retain: bool) -> Self {
        self.retain_predictions = retain;
        self
    }
    pub fn normalize_features(mut self, normalize: bool) -> Self {
        self.normalize_features = normalize;
        self
    }
    pub fn normalize_target(mut self, normalize: bool) -> Self {
        self.normalize_target = normalize;
        self
    }

    pub fn build(self) -> Result<ModelabilityConfig, ConfigError> {
        let n_splits = self
            .n_splits
            .ok_or(ConfigError::MissingParameter("n_splits"))?;
        if n_splits < 2 {
            return Err(ConfigError::InvalidValue {
                key: "n_splits",
                value: n_splits.to_string(),
            });
        }
        Ok(ModelabilityConfig {
            n_splits,
            seed: self.seed.ok_or(ConfigError::MissingParameter("seed"))?,
            retain_predictions: self.retain_predictions,
            normalize_features: self.normalize_features,
            normalize_target: self.normalize_target,
        })
    }
}

/// One metric to evaluate against one named dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricJob {
    pub spec: MetricSpec,
    pub dataset: String,
}

/// Everything a benchmark run evaluates: the loaded datasets and the metric jobs.
#[derive(Debug, Clone)]
pub struct BenchmarkPlan {
    pub datasets: BTreeMap<String, Dataset>,
    pub jobs: Vec<MetricJob>,
}

impl BenchmarkPlan {
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }
}

#[derive(Default)]
pub struct BenchmarkPlanBuilder {
    datasets: BTreeMap<String, Dataset>,
    jobs: Vec<MetricJob>,
}

impl BenchmarkPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(mut self, dataset: Dataset) -> Self {
        self.datasets.insert(dataset.name().to_string(), dataset);
        self
    }

    pub fn job(mut self, spec: MetricSpec, dataset: impl Into<String>) -> Self {
        self.jobs.push(MetricJob {
            spec,
            dataset: dataset.into(),
        });
        self
    }

    /// Checks that every job names a loaded dataset and carries a usable variation space.
    pub fn build(self) -> Result<BenchmarkPlan, ConfigError> {
        if self.jobs.is_empty() {
            return Err(ConfigError::MissingParameter("metrics"));
        }
        for job in &self.jobs {
            if !self.datasets.contains_key(&job.dataset) {
                return Err(ConfigError::UnknownDataset {
                    metric: job.spec.kind().to_string(),
                    dataset: job.dataset.clone(),
                });
            }
            job.spec.validate()?;
        }
        Ok(BenchmarkPlan {
            datasets: self.datasets,
            jobs: self.jobs,
        })
    }
}
