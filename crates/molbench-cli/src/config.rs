use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use molbench::core::io::dataset::DatasetSpec;
use molbench::core::regression::{EstimatorFamily, ParamGrid};
use molbench::engine::backend::BackendKind;
use molbench::engine::config::ModelabilityConfigBuilder;
use molbench::engine::inference::grpc::DEFAULT_MIN_JITTER_RADIUS;
use molbench::engine::inference::proto::GenerativeModel;
use molbench::engine::metrics::registry::{MetricKind, MetricSpec};
use molbench::engine::metrics::sampling::SamplingMetric;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "http://localhost:50051";
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialModelConfig {
    name: Option<String>,
    endpoint: Option<String>,
    min_jitter_radius: Option<f64>,
    display_name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialCacheConfig {
    path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    path: Option<PathBuf>,
    exp_name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialComputeConfig {
    backend: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialDatasetConfig {
    file: PathBuf,
    smiles_column: Option<String>,
    #[serde(default)]
    properties: Vec<String>,
    max_seq_len: Option<usize>,
    remove_invalid: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTrainingSetConfig {
    file: PathBuf,
    smiles_column: Option<String>,
}

/// One `[metrics.<kind>]` table. Keys that do not apply to the kind are rejected
/// when the table is resolved.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialMetricConfig {
    enabled: Option<bool>,
    dataset: Option<String>,
    // sampling metrics
    num_samples: Option<usize>,
    radius: Option<Vec<f64>>,
    // nearest neighbor correlation; 0 means every other molecule
    top_k: Option<Vec<usize>>,
    // modelability
    models: Option<Vec<String>>,
    n_splits: Option<usize>,
    seed: Option<u64>,
    retain_predictions: Option<bool>,
    normalize_features: Option<bool>,
    normalize_target: Option<bool>,
    grids: Option<BTreeMap<String, BTreeMap<String, Vec<f64>>>>,
}

impl PartialMetricConfig {
    fn present_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        let mut mark = |present: bool, key: &'static str| {
            if present {
                keys.push(key);
            }
        };
        mark(self.num_samples.is_some(), "num-samples");
        mark(self.radius.is_some(), "radius");
        mark(self.top_k.is_some(), "top-k");
        mark(self.models.is_some(), "models");
        mark(self.n_splits.is_some(), "n-splits");
        mark(self.seed.is_some(), "seed");
        mark(self.retain_predictions.is_some(), "retain-predictions");
        mark(self.normalize_features.is_some(), "normalize-features");
        mark(self.normalize_target.is_some(), "normalize-target");
        mark(self.grids.is_some(), "grids");
        keys
    }

    fn accepted_keys(kind: MetricKind) -> &'static [&'static str] {
        match kind {
            MetricKind::Validity | MetricKind::Uniqueness | MetricKind::Novelty => {
                &["num-samples", "radius"]
            }
            MetricKind::NearestNeighborCorrelation => &["top-k"],
            MetricKind::Modelability => &[
                "models",
                "n-splits",
                "seed",
                "retain-predictions",
                "normalize-features",
                "normalize-target",
                "grids",
            ],
        }
    }

    fn into_spec(self, kind: MetricKind) -> Result<MetricSpec> {
        if let Some(key) = self
            .present_keys()
            .into_iter()
            .find(|key| !Self::accepted_keys(kind).contains(key))
        {
            return Err(CliError::Config(format!(
                "`metrics.{}` does not accept `{}`.",
                kind, key
            )));
        }

        let spec = match kind.default_spec() {
            MetricSpec::Sampling {
                num_samples, radii, ..
            } => MetricSpec::Sampling {
                metric: sampling_metric(kind)?,
                num_samples: self.num_samples.unwrap_or(num_samples),
                radii: self.radius.unwrap_or(radii),
            },
            MetricSpec::NearestNeighbor { top_k } => MetricSpec::NearestNeighbor {
                top_k: self
                    .top_k
                    .map(|values| values.into_iter().map(|k| (k > 0).then_some(k)).collect())
                    .unwrap_or(top_k),
            },
            MetricSpec::Modelability { config, .. } => {
                let mut families = match self.models {
                    Some(names) => names
                        .iter()
                        .map(|name| {
                            EstimatorFamily::from_str(name)
                                .map_err(|e| CliError::Config(e.to_string()))
                        })
                        .collect::<Result<Vec<_>>>()?,
                    None => EstimatorFamily::ALL.to_vec(),
                };
                families.sort();
                families.dedup();
                let mut grids = self.grids.unwrap_or_default();
                let families: Vec<(EstimatorFamily, ParamGrid)> = families
                    .into_iter()
                    .map(|family| {
                        let grid = grids
                            .remove(family.name())
                            .map(|values| values.into_iter().collect())
                            .unwrap_or_else(|| family.default_grid());
                        (family, grid)
                    })
                    .collect();
                if let Some(unused) = grids.keys().next() {
                    return Err(CliError::Config(format!(
                        "`metrics.modelability.grids.{}` names a model that is not enabled.",
                        unused
                    )));
                }
                let config = ModelabilityConfigBuilder::new()
                    .n_splits(self.n_splits.unwrap_or(config.n_splits))
                    .seed(self.seed.unwrap_or(config.seed))
                    .retain_predictions(self.retain_predictions.unwrap_or(config.retain_predictions))
                    .normalize_features(self.normalize_features.unwrap_or(config.normalize_features))
                    .normalize_target(self.normalize_target.unwrap_or(config.normalize_target))
                    .build()
                    .map_err(|e| CliError::Config(e.to_string()))?;
                MetricSpec::Modelability { families, config }
            }
        };
        spec.validate()
            .map_err(|e| CliError::Config(format!("`metrics.{}`: {}", kind, e)))?;
        Ok(spec)
    }
}

fn sampling_metric(kind: MetricKind) -> Result<SamplingMetric> {
    match kind {
        MetricKind::Validity => Ok(SamplingMetric::Validity),
        MetricKind::Uniqueness => Ok(SamplingMetric::Uniqueness),
        MetricKind::Novelty => Ok(SamplingMetric::Novelty),
        other => Err(CliError::Config(format!("`{}` is not a sampling metric.", other))),
    }
}

/// Connection settings for the model server.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: GenerativeModel,
    pub endpoint: String,
    pub min_jitter_radius: f64,
    pub display_name: Option<String>,
}

/// Location and column of the training-set molecules used by novelty.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSetSettings {
    pub path: PathBuf,
    pub smiles_column: Option<String>,
}

/// A metric to run together with the dataset it runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSettings {
    pub spec: MetricSpec,
    pub dataset: String,
}

/// The fully resolved configuration of one `run` invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub exp_name: String,
    pub backend: BackendKind,
    pub datasets: Vec<DatasetSpec>,
    pub training_set: Option<TrainingSetSettings>,
    pub metrics: Vec<MetricSettings>,
}

impl AppConfig {
    pub fn metrics_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.exp_name))
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_predictions.jsonl", self.exp_name))
    }

    /// Whether any enabled metric retains per-molecule predictions.
    pub fn retains_predictions(&self) -> bool {
        self.metrics.iter().any(|m| {
            matches!(&m.spec, MetricSpec::Modelability { config, .. } if config.retain_predictions)
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialBenchmarkConfig {
    model: Option<PartialModelConfig>,
    cache: Option<PartialCacheConfig>,
    output: Option<PartialOutputConfig>,
    compute: Option<PartialComputeConfig>,
    #[serde(default)]
    datasets: BTreeMap<String, PartialDatasetConfig>,
    training_set: Option<PartialTrainingSetConfig>,
    #[serde(default)]
    metrics: BTreeMap<String, PartialMetricConfig>,
}

impl PartialBenchmarkConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<AppConfig> {
        self.apply_set_values(&args.set_values)?;

        let model_config = self.model.take().unwrap_or_default();
        let cache_config = self.cache.take().unwrap_or_default();
        let output_config = self.output.take().unwrap_or_default();
        let compute_config = self.compute.take().unwrap_or_default();

        let model_name = args
            .model
            .as_ref()
            .or(model_config.name.as_ref())
            .ok_or_else(|| {
                CliError::Config(
                    "`model.name` is required either in the config file or via --model."
                        .to_string(),
                )
            })?;
        let model = GenerativeModel::from_str(model_name).map_err(CliError::Config)?;
        let min_jitter_radius = model_config
            .min_jitter_radius
            .unwrap_or(DEFAULT_MIN_JITTER_RADIUS);
        if !(min_jitter_radius.is_finite() && min_jitter_radius > 0.0) {
            return Err(CliError::Config(format!(
                "`model.min-jitter-radius` must be positive, got {}.",
                min_jitter_radius
            )));
        }
        let model = ModelSettings {
            model,
            endpoint: args
                .endpoint
                .clone()
                .or(model_config.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            min_jitter_radius,
            display_name: model_config.display_name,
        };

        let backend = match args.backend.as_ref().or(compute_config.backend.as_ref()) {
            Some(name) => BackendKind::from_str(name).map_err(|e| CliError::Config(e.to_string()))?,
            None => BackendKind::Parallel,
        };

        let exp_name = args
            .exp_name
            .clone()
            .or(output_config.exp_name)
            .unwrap_or_else(|| {
                model
                    .display_name
                    .clone()
                    .unwrap_or_else(|| model.model.to_string())
            });

        let datasets = Self::merge_datasets(std::mem::take(&mut self.datasets))?;
        let metrics = Self::merge_metrics(std::mem::take(&mut self.metrics), &datasets, &args.only)?;
        if metrics.iter().any(|m| m.spec.kind() == MetricKind::Novelty) && self.training_set.is_none() {
            return Err(CliError::Config(
                "`metrics.novelty` requires a `[training-set]` section.".to_string(),
            ));
        }

        Ok(AppConfig {
            model,
            cache_dir: args
                .cache_dir
                .clone()
                .or(cache_config.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            output_dir: args
                .output
                .clone()
                .or(output_config.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            exp_name,
            backend,
            datasets,
            training_set: self.training_set.map(|t| TrainingSetSettings {
                path: t.file,
                smiles_column: t.smiles_column,
            }),
            metrics,
        })
    }

    fn merge_datasets(partials: BTreeMap<String, PartialDatasetConfig>) -> Result<Vec<DatasetSpec>> {
        if partials.is_empty() {
            return Err(CliError::Config(
                "At least one `[datasets.<name>]` section is required.".to_string(),
            ));
        }
        Ok(partials
            .into_iter()
            .map(|(name, partial)| {
                let mut spec = DatasetSpec::new(name, partial.file);
                if let Some(column) = partial.smiles_column {
                    spec.smiles_column = column;
                }
                spec.properties = partial.properties;
                spec.max_seq_len = partial.max_seq_len;
                spec.remove_invalid = partial.remove_invalid.unwrap_or(true);
                spec
            })
            .collect())
    }

    fn merge_metrics(
        partials: BTreeMap<String, PartialMetricConfig>,
        datasets: &[DatasetSpec],
        only: &[String],
    ) -> Result<Vec<MetricSettings>> {
        let only = only
            .iter()
            .map(|name| MetricKind::from_str(name).map_err(|e| CliError::Argument(e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        let mut metrics = Vec::new();
        for (key, partial) in partials {
            let kind = MetricKind::from_str(&key).map_err(|e| CliError::Config(e.to_string()))?;
            if !partial.enabled.unwrap_or(true) || (!only.is_empty() && !only.contains(&kind)) {
                debug!(metric = %kind, "Skipping disabled metric.");
                continue;
            }
            let dataset = match (&partial.dataset, datasets) {
                (Some(name), _) => name.clone(),
                (None, [single]) => single.name.clone(),
                (None, _) => {
                    return Err(CliError::Config(format!(
                        "`metrics.{}.dataset` is required when more than one dataset is configured.",
                        key
                    )));
                }
            };
            if !datasets.iter().any(|d| d.name == dataset) {
                return Err(CliError::Config(format!(
                    "`metrics.{}` refers to unknown dataset '{}'.",
                    key, dataset
                )));
            }
            metrics.push(MetricSettings {
                spec: partial.into_spec(kind)?,
                dataset,
            });
        }
        metrics.sort_by_key(|m| m.spec.kind());

        if metrics.is_empty() {
            return Err(CliError::Config(
                "No metrics are enabled; add a `[metrics.<name>]` section.".to_string(),
            ));
        }
        Ok(metrics)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key.split('.').collect::<Vec<_>>().as_slice() {
                ["model", "name"] => {
                    self.model.get_or_insert_with(Default::default).name = Some(value_str.to_string());
                }
                ["model", "endpoint"] => {
                    self.model.get_or_insert_with(Default::default).endpoint =
                        Some(value_str.to_string());
                }
                ["model", "min-jitter-radius"] => {
                    self.model
                        .get_or_insert_with(Default::default)
                        .min_jitter_radius = Some(parse_value(key, value_str)?);
                }
                ["model", "display-name"] => {
                    self.model.get_or_insert_with(Default::default).display_name =
                        Some(value_str.to_string());
                }
                ["cache", "path"] => {
                    self.cache.get_or_insert_with(Default::default).path = Some(value_str.into());
                }
                ["output", "path"] => {
                    self.output.get_or_insert_with(Default::default).path = Some(value_str.into());
                }
                ["output", "exp-name"] => {
                    self.output.get_or_insert_with(Default::default).exp_name =
                        Some(value_str.to_string());
                }
                ["compute", "backend"] => {
                    self.compute.get_or_insert_with(Default::default).backend =
                        Some(value_str.to_string());
                }
                ["metrics", metric, field] => {
                    let partial = self.metrics.entry(metric.to_string()).or_default();
                    match *field {
                        "enabled" => partial.enabled = Some(parse_value(key, value_str)?),
                        "dataset" => partial.dataset = Some(value_str.to_string()),
                        "num-samples" => partial.num_samples = Some(parse_value(key, value_str)?),
                        "n-splits" => partial.n_splits = Some(parse_value(key, value_str)?),
                        "seed" => partial.seed = Some(parse_value(key, value_str)?),
                        "retain-predictions" => {
                            partial.retain_predictions = Some(parse_value(key, value_str)?)
                        }
                        _ => return Err(unsupported_key(key)),
                    }
                }
                _ => return Err(unsupported_key(key)),
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn unsupported_key(key: &str) -> CliError {
    CliError::Config(format!("Unsupported configuration key for --set: '{}'", key))
}
