use super::linear::check_predict_shape;
use super::{Regressor, RegressionError, check_training_shape};
use nalgebra::{DMatrix, DVector};

const MAX_SWEEPS: usize = 200;
const TOLERANCE: f64 = 1e-3;

fn rbf(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize, gamma: f64) -> f64 {
    let sq: f64 = (0..a.ncols()).map(|k| (a[(i, k)] - b[(j, k)]).powi(2)).sum();
    (-gamma * sq).exp()
}

/// Epsilon-insensitive support vector regression with an RBF kernel.
///
/// The dual `0.5 b'Kb - y'b + epsilon |b|_1` with `-C <= b_i <= C` is minimised by
/// coordinate descent on a mean-centred target; the target mean acts as the bias.
#[derive(Debug, Clone)]
pub struct SupportVectorRegression {
    c: f64,
    gamma: f64,
    epsilon: f64,
    support: Option<(DMatrix<f64>, DVector<f64>)>,
    bias: f64,
}

impl SupportVectorRegression {
    pub fn new(c: f64, gamma: f64, epsilon: f64) -> Self {
        Self {
            c,
            gamma,
            epsilon,
            support: None,
            bias: 0.0,
        }
    }

    fn kernel_rows(&self, a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(a.nrows(), b.nrows(), |i, j| rbf(a, i, b, j, self.gamma))
    }
}

impl Regressor for SupportVectorRegression {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), RegressionError> {
        check_training_shape(x, y)?;
        let n = x.nrows();
        let bias = y.mean();
        let target = y.map(|v| v - bias);
        let kernel = self.kernel_rows(x, x);

        let mut beta = DVector::<f64>::zeros(n);
        // Running value of K * beta.
        let mut fitted = DVector::<f64>::zeros(n);
        for _ in 0..MAX_SWEEPS {
            let mut max_delta: f64 = 0.0;
            for i in 0..n {
                let k_ii = kernel[(i, i)];
                if k_ii <= 0.0 {
                    continue;
                }
                let gradient = fitted[i] - target[i];
                let unconstrained = beta[i] - gradient / k_ii;
                let shrunk = unconstrained.signum()
                    * (unconstrained.abs() - self.epsilon / k_ii).max(0.0);
                let updated = shrunk.clamp(-self.c, self.c);
                let delta = updated - beta[i];
                if delta != 0.0 {
                    fitted.axpy(delta, &kernel.column(i), 1.0);
                    beta[i] = updated;
                    max_delta = max_delta.max(delta.abs());
                }
            }
            if max_delta < TOLERANCE {
                break;
            }
        }

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(RegressionError::Numerical("dual solver diverged".to_string()));
        }
        self.bias = bias;
        self.support = Some((x.clone(), beta));
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, RegressionError> {
        let (support, beta) = self.support.as_ref().ok_or(RegressionError::NotFitted)?;
        check_predict_shape(x, support.ncols())?;
        let kernel = self.kernel_rows(x, support);
        Ok((kernel * beta).add_scalar(self.bias))
    }
}
