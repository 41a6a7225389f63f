/// Column-wise z-score scaling, fitted on the data being modelled.
///
/// Columns with zero variance keep a unit scale so they pass through centred.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fits on row-major `rows`, each of the same width.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in scales.iter_mut() {
            let std = (*s / n).sqrt();
            *s = if std > 0.0 { std } else { 1.0 };
        }
        Self { means, scales }
    }

    /// Fits on a single column of values.
    pub fn fit_column(values: &[f64]) -> Self {
        let rows: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
        Self::fit(&rows)
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect()
    }

    pub fn transform_column(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| (v - self.means[0]) / self.scales[0]).collect()
    }

    pub fn inverse_transform_column(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| v * self.scales[0] + self.means[0]).collect()
    }
}
