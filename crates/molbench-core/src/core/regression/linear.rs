use super::{Regressor, RegressionError, check_training_shape};
use nalgebra::{DMatrix, DVector};

/// Column means of `x`, used to centre features before solving.
pub(crate) fn column_means(x: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(x.ncols(), x.column_iter().map(|c| c.mean()))
}

pub(crate) fn centered(x: &DMatrix<f64>, means: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] - means[j])
}

pub(crate) fn check_predict_shape(x: &DMatrix<f64>, n_features: usize) -> Result<(), RegressionError> {
    if x.ncols() != n_features {
        return Err(RegressionError::DimensionMismatch {
            expected: n_features,
            found: x.ncols(),
        });
    }
    Ok(())
}

/// Ordinary least squares with an intercept.
///
/// Solved through the SVD of the centred design matrix, which yields the
/// minimum-norm solution when features outnumber samples.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coefficients: Option<DVector<f64>>,
    intercept: f64,
}

impl LinearRegression {
    pub fn coefficients(&self) -> Option<&DVector<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), RegressionError> {
        check_training_shape(x, y)?;
        let means = column_means(x);
        let y_mean = y.mean();
        let coefficients = if x.ncols() == 0 {
            DVector::zeros(0)
        } else {
            let xc = centered(x, &means);
            let yc = y.map(|v| v - y_mean);
            xc.svd(true, true)
                .solve(&yc, 1e-10)
                .map_err(|e| RegressionError::Numerical(e.to_string()))?
        };
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(RegressionError::Numerical(
                "least squares produced non-finite coefficients".to_string(),
            ));
        }
        self.intercept = y_mean - means.dot(&coefficients);
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, RegressionError> {
        let coefficients = self.coefficients.as_ref().ok_or(RegressionError::NotFitted)?;
        check_predict_shape(x, coefficients.len())?;
        Ok((x * coefficients).add_scalar(self.intercept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_relationship() {
        let x = DMatrix::from_row_slice(5, 2, &[0.0, 1.0, 1.0, 0.0, 2.0, 1.0, 3.0, 5.0, 4.0, 2.0]);
        let y = DVector::from_iterator(5, x.row_iter().map(|r| 2.0 * r[0] - 3.0 * r[1] + 1.5));
        let mut model = LinearRegression::default();
        model.fit(&x, &y).unwrap();
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 2.0).abs() < 1e-9);
        assert!((coefficients[1] + 3.0).abs() < 1e-9);
        assert!((model.intercept() - 1.5).abs() < 1e-9);
        let predicted = model.predict(&x).unwrap();
        assert!((predicted - y).amax() < 1e-9);
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = LinearRegression::default();
        assert_eq!(
            model.predict(&DMatrix::zeros(1, 1)).unwrap_err(),
            RegressionError::NotFitted
        );
    }

    #[test]
    fn constant_features_predict_the_mean() {
        let x = DMatrix::from_element(4, 3, 1.0);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let mut model = LinearRegression::default();
        model.fit(&x, &y).unwrap();
        let predicted = model.predict(&x).unwrap();
        assert!(predicted.iter().all(|p| (p - 2.5).abs() < 1e-9));
    }
}
