use super::sampling::SamplingMetric;
use super::{MetricError, modelability, nearest_neighbor, sampling};
use crate::core::models::dataset::Dataset;
use crate::core::models::record::MetricOutcome;
use crate::core::regression::{EstimatorFamily, ParamGrid};
use crate::engine::config::{ConfigError, ModelabilityConfig};
use crate::engine::context::BenchmarkContext;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NUM_SAMPLES: usize = 10;
pub const DEFAULT_RADII: [f64; 1] = [1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Validity,
    Uniqueness,
    Novelty,
    NearestNeighborCorrelation,
    Modelability,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Validity,
        MetricKind::Uniqueness,
        MetricKind::Novelty,
        MetricKind::NearestNeighborCorrelation,
        MetricKind::Modelability,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Validity => "validity",
            MetricKind::Uniqueness => "unique",
            MetricKind::Novelty => "novelty",
            MetricKind::NearestNeighborCorrelation => nearest_neighbor::METRIC_NAME,
            MetricKind::Modelability => modelability::METRIC_NAME,
        }
    }

    /// The variation space used when configuration only enables the metric.
    pub fn default_spec(&self) -> MetricSpec {
        let sampled = |metric| MetricSpec::Sampling {
            metric,
            num_samples: DEFAULT_NUM_SAMPLES,
            radii: DEFAULT_RADII.to_vec(),
        };
        match self {
            MetricKind::Validity => sampled(SamplingMetric::Validity),
            MetricKind::Uniqueness => sampled(SamplingMetric::Uniqueness),
            MetricKind::Novelty => sampled(SamplingMetric::Novelty),
            MetricKind::NearestNeighborCorrelation => MetricSpec::NearestNeighbor { top_k: vec![None] },
            MetricKind::Modelability => MetricSpec::Modelability {
                families: EstimatorFamily::ALL
                    .iter()
                    .map(|family| (*family, family.default_grid()))
                    .collect(),
                config: ModelabilityConfig {
                    n_splits: 4,
                    seed: 0,
                    retain_predictions: false,
                    normalize_features: false,
                    normalize_target: false,
                },
            },
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "validity" => Ok(MetricKind::Validity),
            "unique" | "uniqueness" => Ok(MetricKind::Uniqueness),
            "novelty" => Ok(MetricKind::Novelty),
            "nearest_neighbor_correlation" => Ok(MetricKind::NearestNeighborCorrelation),
            "modelability" => Ok(MetricKind::Modelability),
            _ => Err(ConfigError::UnknownMetric(s.to_string())),
        }
    }
}

/// A metric together with the parameter values it is swept over.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSpec {
    Sampling {
        metric: SamplingMetric,
        num_samples: usize,
        radii: Vec<f64>,
    },
    NearestNeighbor {
        /// `None` uses every other molecule as a neighbour.
        top_k: Vec<Option<usize>>,
    },
    Modelability {
        families: Vec<(EstimatorFamily, ParamGrid)>,
        config: ModelabilityConfig,
    },
}

impl MetricSpec {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricSpec::Sampling { metric, .. } => match metric {
                SamplingMetric::Validity => MetricKind::Validity,
                SamplingMetric::Uniqueness => MetricKind::Uniqueness,
                SamplingMetric::Novelty => MetricKind::Novelty,
            },
            MetricSpec::NearestNeighbor { .. } => MetricKind::NearestNeighborCorrelation,
            MetricSpec::Modelability { .. } => MetricKind::Modelability,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            MetricSpec::Sampling {
                num_samples, radii, ..
            } => {
                if *num_samples == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "num_samples",
                        value: num_samples.to_string(),
                    });
                }
                if radii.is_empty() {
                    return Err(ConfigError::MissingParameter("radius"));
                }
                if let Some(bad) = radii.iter().find(|r| !r.is_finite() || **r < 0.0) {
                    return Err(ConfigError::InvalidValue {
                        key: "radius",
                        value: bad.to_string(),
                    });
                }
            }
            MetricSpec::NearestNeighbor { top_k } => {
                if top_k.is_empty() {
                    return Err(ConfigError::MissingParameter("top_k"));
                }
            }
            MetricSpec::Modelability { families, config } => {
                if families.is_empty() {
                    return Err(ConfigError::MissingParameter("models"));
                }
                if config.n_splits < 2 {
                    return Err(ConfigError::InvalidValue {
                        key: "n_splits",
                        value: config.n_splits.to_string(),
                    });
                }
                for (family, grid) in families {
                    family
                        .validate_grid(grid)
                        .map_err(|e| ConfigError::InvalidGrid {
                            family: family.to_string(),
                            reason: e.to_string(),
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Expands this metric into one variation per swept value, in configuration order.
    pub fn variations(&self) -> Vec<Variation> {
        match self {
            MetricSpec::Sampling {
                metric,
                num_samples,
                radii,
            } => radii
                .iter()
                .map(|&radius| Variation::Sampling {
                    metric: *metric,
                    num_samples: *num_samples,
                    radius,
                })
                .collect(),
            MetricSpec::NearestNeighbor { top_k } => top_k
                .iter()
                .map(|&top_k| Variation::NearestNeighbor { top_k })
                .collect(),
            MetricSpec::Modelability { families, config } => families
                .iter()
                .map(|(family, grid)| Variation::Modelability {
                    family: *family,
                    grid: grid.clone(),
                    config: *config,
                })
                .collect(),
        }
    }
}

/// One point of a metric's variation space; computing it yields one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Variation {
    Sampling {
        metric: SamplingMetric,
        num_samples: usize,
        radius: f64,
    },
    NearestNeighbor {
        top_k: Option<usize>,
    },
    Modelability {
        family: EstimatorFamily,
        grid: ParamGrid,
        config: ModelabilityConfig,
    },
}

impl Variation {
    pub fn compute(
        &self,
        context: &BenchmarkContext,
        dataset: &Dataset,
    ) -> Result<MetricOutcome, MetricError> {
        match self {
            Variation::Sampling {
                metric,
                num_samples,
                radius,
            } => sampling::run(context, *metric, dataset, *num_samples, *radius),
            Variation::NearestNeighbor { top_k } => nearest_neighbor::run(context, dataset, *top_k),
            Variation::Modelability {
                family,
                grid,
                config,
            } => modelability::run(context, dataset, *family, grid, config),
        }
    }
}

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variation::Sampling { metric, radius, .. } => write!(f, "{} (radius {})", metric, radius),
            Variation::NearestNeighbor { top_k: Some(k) } => {
                write!(f, "{} (top_k {})", nearest_neighbor::METRIC_NAME, k)
            }
            Variation::NearestNeighbor { top_k: None } => f.write_str(nearest_neighbor::METRIC_NAME),
            Variation::Modelability { family, .. } => {
                write!(f, "{} ({})", modelability::METRIC_NAME, family)
            }
        }
    }
}
