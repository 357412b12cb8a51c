//! Principal component analysis via power iteration with deflation.
//!
//! The clustering stage needs a full orthogonal re-basis of a 19-column
//! matrix and the ingredients analyser needs the first ~10 components of a
//! log co-occurrence matrix. Both are small enough that repeated power
//! iteration on the covariance matrix is fine, and the fixed start vector
//! keeps the decomposition fully deterministic across runs.

use ndarray::{Array1, Array2, Axis};

const POWER_ITERATIONS: usize = 300;
const CONVERGENCE_EPS: f64 = 1e-10;

/// Fitted PCA model: column means plus an orthonormal component matrix of
/// shape `(n_components, n_features)`.
#[derive(Debug, Clone)]
pub struct Pca {
    mean: Array1<f64>,
    components: Array2<f64>,
    explained_variance: Vec<f64>,
}

impl Pca {
    /// Fit up to `n_components` principal components.
    ///
    /// The effective component count is capped at `min(n_rows, n_cols)`;
    /// directions whose eigenvalue underflows are returned as zero vectors
    /// so the output shape stays predictable.
    #[must_use]
    pub fn fit(data: &Array2<f64>, n_components: usize) -> Self {
        let n_rows = data.nrows();
        let n_cols = data.ncols();
        let n_components = n_components.min(n_rows).min(n_cols);

        let mean = data.sum_axis(Axis(0)) / n_rows.max(1) as f64;
        let mut centered = data.clone();
        for mut row in centered.rows_mut() {
            row -= &mean;
        }

        let ddof = if n_rows > 1 { n_rows - 1 } else { 1 };
        let mut covariance = centered.t().dot(&centered) / ddof as f64;

        let mut components = Array2::zeros((n_components, n_cols));
        let mut explained_variance = Vec::with_capacity(n_components);

        for c in 0..n_components {
            let direction = power_iteration(&covariance);
            let eigenvalue = direction.dot(&covariance.dot(&direction));
            if eigenvalue <= CONVERGENCE_EPS {
                explained_variance.push(0.0);
                continue;
            }
            // Deflate: remove the found component from the covariance.
            let outer = outer_product(&direction, &direction);
            covariance -= &(outer * eigenvalue);

            components.row_mut(c).assign(&direction);
            explained_variance.push(eigenvalue);
        }

        Self {
            mean,
            components,
            explained_variance,
        }
    }

    /// Project a matrix onto the fitted components.
    #[must_use]
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut centered = data.clone();
        for mut row in centered.rows_mut() {
            row -= &self.mean;
        }
        centered.dot(&self.components.t())
    }

    #[must_use]
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    #[must_use]
    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }
}

/// Dominant eigenvector of a symmetric matrix, or the zero vector when the
/// matrix has collapsed to (numerical) zero.
fn power_iteration(matrix: &Array2<f64>) -> Array1<f64> {
    let d = matrix.ncols();
    // Fixed, non-uniform start vector: deterministic and unlikely to be
    // orthogonal to the dominant eigenvector.
    let mut v = Array1::from_shape_fn(d, |i| 1.0 / (i + 1) as f64);
    let norm = v.dot(&v).sqrt();
    v /= norm;

    for _ in 0..POWER_ITERATIONS {
        let next = matrix.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm < CONVERGENCE_EPS {
            return Array1::zeros(d);
        }
        let next = next / norm;
        let delta = (&next - &v).dot(&(&next - &v)).sqrt();
        v = next;
        if delta < CONVERGENCE_EPS {
            break;
        }
    }

    // Fix the sign so the largest-magnitude coordinate is positive.
    let pivot = v
        .iter()
        .cloned()
        .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 { -v } else { v }
}

fn outer_product(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let n = a.len();
    Array2::from_shape_fn((n, n), |(i, j)| a[i] * b[j])
}
