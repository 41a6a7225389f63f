//! Regression estimators and the cross-validated grid search used to score
//! how well a representation predicts a molecular property.

mod elastic_net;
mod forest;
mod grid;
mod kfold;
mod linear;
mod search;
mod svr;

pub use elastic_net::ElasticNet;
pub use forest::RandomForest;
pub use grid::{Hyperparameters, ParamGrid};
pub use kfold::KFold;
pub use linear::LinearRegression;
pub use search::{GridSearch, GridSearchOutcome};
pub use svr::SupportVectorRegression;

use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegressionError {
    #[error("Unknown parameter '{name}' for estimator '{family}'")]
    UnknownParameter { family: &'static str, name: String },

    #[error("Invalid value {value} for parameter '{name}' of estimator '{family}'")]
    InvalidParameter {
        family: &'static str,
        name: String,
        value: f64,
    },

    #[error("Unknown estimator family '{0}'")]
    UnknownFamily(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Cannot fit an estimator on {0} samples")]
    NotEnoughSamples(usize),

    #[error("Estimator used before fitting")]
    NotFitted,

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Invalid fold configuration: {n_splits} splits for {n_samples} samples")]
    InvalidFolds { n_splits: usize, n_samples: usize },

    #[error("Every one of the {0} parameter combinations failed to fit")]
    AllCombinationsFailed(usize),
}

/// A supervised regressor over dense feature matrices (rows are samples).
pub trait Regressor: Send {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), RegressionError>;
    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, RegressionError>;
}

pub(crate) fn check_training_shape(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<(), RegressionError> {
    if x.nrows() != y.len() {
        return Err(RegressionError::DimensionMismatch {
            expected: x.nrows(),
            found: y.len(),
        });
    }
    if x.nrows() == 0 {
        return Err(RegressionError::NotEnoughSamples(0));
    }
    Ok(())
}

/// The estimator families available to the modelability metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EstimatorFamily {
    LinearRegression,
    ElasticNet,
    SupportVectorMachine,
    RandomForest,
}

impl EstimatorFamily {
    pub const ALL: [EstimatorFamily; 4] = [
        EstimatorFamily::LinearRegression,
        EstimatorFamily::ElasticNet,
        EstimatorFamily::SupportVectorMachine,
        EstimatorFamily::RandomForest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EstimatorFamily::LinearRegression => "linear_regression",
            EstimatorFamily::ElasticNet => "elastic_net",
            EstimatorFamily::SupportVectorMachine => "support_vector_machine",
            EstimatorFamily::RandomForest => "random_forest",
        }
    }

    /// Parameter names this family understands.
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            EstimatorFamily::LinearRegression => &[],
            EstimatorFamily::ElasticNet => &["alpha", "l1_ratio"],
            EstimatorFamily::SupportVectorMachine => &["C", "epsilon", "gamma"],
            EstimatorFamily::RandomForest => &["max_depth", "n_estimators"],
        }
    }

    /// The hyperparameter grid searched when none is configured.
    pub fn default_grid(&self) -> ParamGrid {
        match self {
            EstimatorFamily::LinearRegression => ParamGrid::new(),
            EstimatorFamily::ElasticNet => ParamGrid::new()
                .with("alpha", vec![0.001, 0.01, 0.1, 1.0, 10.0, 100.0])
                .with("l1_ratio", vec![0.0, 0.2, 0.5, 0.7, 1.0]),
            EstimatorFamily::SupportVectorMachine => ParamGrid::new()
                .with("C", vec![1.75, 5.0, 7.5, 10.0, 20.0])
                .with("gamma", vec![1e-4, 1e-3, 1e-2, 0.1, 1.0])
                .with("epsilon", vec![0.001, 0.01, 0.1, 0.3]),
            EstimatorFamily::RandomForest => {
                ParamGrid::new().with("n_estimators", vec![10.0, 50.0, 100.0, 150.0, 200.0])
            }
        }
    }

    /// Rejects grids naming parameters this family does not have.
    pub fn validate_grid(&self, grid: &ParamGrid) -> Result<(), RegressionError> {
        match grid.keys().find(|k| !self.parameters().contains(&k.as_str())) {
            Some(unknown) => Err(RegressionError::UnknownParameter {
                family: self.name(),
                name: unknown.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Builds an unfitted estimator for one parameter combination.
    pub fn build(
        &self,
        params: &Hyperparameters,
        seed: u64,
    ) -> Result<Box<dyn Regressor>, RegressionError> {
        if let Some(unknown) = params.keys().find(|k| !self.parameters().contains(&k.as_str())) {
            return Err(RegressionError::UnknownParameter {
                family: self.name(),
                name: unknown.clone(),
            });
        }
        let family = self.name();
        let get = |name: &str, default: f64| -> Result<f64, RegressionError> {
            let value = params.get(name).copied().unwrap_or(default);
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(RegressionError::InvalidParameter {
                    family,
                    name: name.to_string(),
                    value,
                })
            }
        };
        Ok(match self {
            EstimatorFamily::LinearRegression => Box::new(LinearRegression::default()),
            EstimatorFamily::ElasticNet => {
                let l1_ratio = get("l1_ratio", 0.5)?;
                if l1_ratio > 1.0 {
                    return Err(RegressionError::InvalidParameter {
                        family,
                        name: "l1_ratio".to_string(),
                        value: l1_ratio,
                    });
                }
                Box::new(ElasticNet::new(get("alpha", 1.0)?, l1_ratio))
            }
            EstimatorFamily::SupportVectorMachine => Box::new(SupportVectorRegression::new(
                get("C", 1.0)?,
                get("gamma", 0.1)?,
                get("epsilon", 0.1)?,
            )),
            EstimatorFamily::RandomForest => {
                let n_estimators = get("n_estimators", 100.0)? as usize;
                let max_depth = match params.get("max_depth") {
                    Some(_) => Some(get("max_depth", 0.0)? as usize),
                    None => None,
                };
                Box::new(RandomForest::new(n_estimators.max(1), max_depth, seed))
            }
        })
    }
}

impl fmt::Display for EstimatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EstimatorFamily {
    type Err = RegressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear_regression" | "linear" => Ok(EstimatorFamily::LinearRegression),
            "elastic_net" | "elasticnet" => Ok(EstimatorFamily::ElasticNet),
            "support_vector_machine" | "svr" | "svm" => Ok(EstimatorFamily::SupportVectorMachine),
            "random_forest" | "rf" => Ok(EstimatorFamily::RandomForest),
            _ => Err(RegressionError::UnknownFamily(s.to_string())),
        }
    }
}
