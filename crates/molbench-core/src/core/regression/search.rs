use super::{EstimatorFamily, Hyperparameters, KFold, ParamGrid, RegressionError};
use crate::core::stats::{mean_squared_error, nan_mean};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

/// Cross-validated exhaustive search over one estimator family's parameter grid.
#[derive(Debug, Clone)]
pub struct GridSearch<'a> {
    pub family: EstimatorFamily,
    pub grid: &'a ParamGrid,
    pub folds: KFold,
    /// Seed handed to stochastic estimators.
    pub seed: u64,
    pub retain_predictions: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSearchOutcome {
    /// Mean cross-validated MSE of the winning combination.
    pub best_score: f64,
    pub best_params: Hyperparameters,
    /// Predictions for every row from the winner refitted on all data.
    pub predictions: Option<Vec<f64>>,
    pub evaluated: usize,
    pub failed: usize,
}

fn select_rows(x: &DMatrix<f64>, rows: &[usize]) -> DMatrix<f64> {
    x.select_rows(rows.iter())
}

fn select_entries(y: &DVector<f64>, rows: &[usize]) -> DVector<f64> {
    DVector::from_iterator(rows.len(), rows.iter().map(|&i| y[i]))
}

impl GridSearch<'_> {
    /// Runs the search. `on_combination` is called after each combination is scored.
    ///
    /// Combinations that fail to fit or score non-finitely are skipped; the first
    /// combination with the strictly lowest score wins.
    pub fn run(
        &self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        mut on_combination: impl FnMut(&Hyperparameters, f64),
    ) -> Result<GridSearchOutcome, RegressionError> {
        if x.nrows() != y.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: x.nrows(),
                found: y.len(),
            });
        }
        self.family.validate_grid(self.grid)?;
        let folds = self.folds.split(x.nrows())?;
        let combinations = self.grid.combinations();

        let mut best: Option<(f64, Hyperparameters)> = None;
        let mut failed = 0;
        for params in &combinations {
            let score = match self.score(params, x, y, &folds) {
                Ok(score) if score.is_finite() => score,
                Ok(score) => {
                    warn!(family = %self.family, ?params, score, "Non-finite cross-validation score.");
                    failed += 1;
                    on_combination(params, f64::INFINITY);
                    continue;
                }
                Err(e) => {
                    warn!(family = %self.family, ?params, error = %e, "Parameter combination failed.");
                    failed += 1;
                    on_combination(params, f64::INFINITY);
                    continue;
                }
            };
            debug!(family = %self.family, ?params, score, "Scored parameter combination.");
            on_combination(params, score);
            if best.as_ref().is_none_or(|(best_score, _)| score < *best_score) {
                best = Some((score, params.clone()));
            }
        }

        let (best_score, best_params) =
            best.ok_or(RegressionError::AllCombinationsFailed(combinations.len()))?;

        let predictions = if self.retain_predictions {
            let mut estimator = self.family.build(&best_params, self.seed)?;
            estimator.fit(x, y)?;
            Some(estimator.predict(x)?.iter().copied().collect())
        } else {
            None
        };

        Ok(GridSearchOutcome {
            best_score,
            best_params,
            predictions,
            evaluated: combinations.len(),
            failed,
        })
    }

    fn score(
        &self,
        params: &Hyperparameters,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        folds: &[(Vec<usize>, Vec<usize>)],
    ) -> Result<f64, RegressionError> {
        let mut fold_errors = Vec::with_capacity(folds.len());
        for (train, test) in folds {
            let mut estimator = self.family.build(params, self.seed)?;
            estimator.fit(&select_rows(x, train), &select_entries(y, train))?;
            let predicted = estimator.predict(&select_rows(x, test))?;
            let truth = select_entries(y, test);
            fold_errors.push(mean_squared_error(truth.as_slice(), predicted.as_slice()));
        }
        Ok(nan_mean(&fold_errors))
    }
}
