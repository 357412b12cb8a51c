//! Column standardization (mean 0, std 1) for the clustering stage.

use ndarray::{Array1, Array2, Axis};

/// Per-column z-standardizer fitted on one matrix, applied to another.
///
/// Uses the population standard deviation; a zero-variance column keeps a
/// scale of 1 so it maps to all zeros instead of dividing by zero.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    /// Fit means and scales on the given matrix (rows = observations).
    #[must_use]
    pub fn fit(data: &Array2<f64>) -> Self {
        let n = data.nrows().max(1) as f64;
        let means = data.sum_axis(Axis(0)) / n;
        let mut scales = Array1::zeros(data.ncols());
        for (j, column) in data.columns().into_iter().enumerate() {
            let var = column.iter().map(|v| (v - means[j]).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            scales[j] = if std > 0.0 { std } else { 1.0 };
        }
        Self { means, scales }
    }

    /// Standardize a matrix with the fitted means and scales.
    #[must_use]
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = data.clone();
        for mut row in out.rows_mut() {
            for j in 0..row.len() {
                row[j] = (row[j] - self.means[j]) / self.scales[j];
            }
        }
        out
    }

    #[must_use]
    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    #[must_use]
    pub fn scales(&self) -> &Array1<f64> {
        &self.scales
    }
}
