use super::linear::{centered, check_predict_shape, column_means};
use super::{Regressor, RegressionError, check_training_shape};
use nalgebra::{DMatrix, DVector};

const MAX_ITER: usize = 1000;
const TOLERANCE: f64 = 1e-4;

/// Linear regression with combined L1 and L2 penalties, fitted by cyclic
/// coordinate descent on
/// `1/(2n) * ||y - Xw - b||^2 + alpha * l1_ratio * ||w||_1 + alpha * (1 - l1_ratio) / 2 * ||w||^2`.
#[derive(Debug, Clone)]
pub struct ElasticNet {
    alpha: f64,
    l1_ratio: f64,
    coefficients: Option<DVector<f64>>,
    intercept: f64,
}

impl ElasticNet {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self {
            alpha,
            l1_ratio,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> Option<&DVector<f64>> {
        self.coefficients.as_ref()
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl Regressor for ElasticNet {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), RegressionError> {
        check_training_shape(x, y)?;
        let n = x.nrows() as f64;
        let means = column_means(x);
        let y_mean = y.mean();
        let xc = centered(x, &means);
        let mut residual = y.map(|v| v - y_mean);
        let mut w = DVector::zeros(x.ncols());

        let l1 = self.alpha * self.l1_ratio * n;
        let l2 = self.alpha * (1.0 - self.l1_ratio) * n;
        let norms: Vec<f64> = xc.column_iter().map(|c| c.norm_squared()).collect();

        for _ in 0..MAX_ITER {
            let mut max_delta: f64 = 0.0;
            let mut max_weight: f64 = 0.0;
            for j in 0..xc.ncols() {
                if norms[j] == 0.0 {
                    continue;
                }
                let column = xc.column(j);
                let old = w[j];
                let rho = column.dot(&residual) + norms[j] * old;
                let new = soft_threshold(rho, l1) / (norms[j] + l2);
                if new != old {
                    residual.axpy(old - new, &column, 1.0);
                    w[j] = new;
                }
                max_delta = max_delta.max((new - old).abs());
                max_weight = max_weight.max(new.abs());
            }
            if max_weight == 0.0 || max_delta <= TOLERANCE * max_weight {
                break;
            }
        }

        if w.iter().any(|c: &f64| !c.is_finite()) {
            return Err(RegressionError::Numerical(
                "coordinate descent diverged".to_string(),
            ));
        }
        self.intercept = y_mean - means.dot(&w);
        self.coefficients = Some(w);
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, RegressionError> {
        let coefficients = self.coefficients.as_ref().ok_or(RegressionError::NotFitted)?;
        check_predict_shape(x, coefficients.len())?;
        Ok((x * coefficients).add_scalar(self.intercept))
    }
}
