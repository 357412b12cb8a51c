//! Sparse cluster co-occurrence counting.
//!
//! The recipe-by-cluster incidence matrix is binary (a cluster counts once
//! per recipe no matter how many of its members appear), and the pairwise
//! counts come from the sparse product `A^T * A` rather than enumerating
//! cluster pairs per recipe. The dense output is `log1p` of the counts.

use std::collections::BTreeSet;

use ndarray::Array2;
use sprs::{CsMat, TriMat};

/// `log1p` of the cluster co-occurrence counts, shape
/// `(n_clusters, n_clusters)`. The diagonal holds per-cluster recipe
/// counts before the log.
#[must_use]
pub fn log_cooccurrence(recipe_clusters: &[BTreeSet<usize>], n_clusters: usize) -> Array2<f64> {
    let mut incidence = TriMat::new((recipe_clusters.len(), n_clusters));
    for (row, clusters) in recipe_clusters.iter().enumerate() {
        for &cluster in clusters {
            incidence.add_triplet(row, cluster, 1.0_f64);
        }
    }
    let incidence: CsMat<f64> = incidence.to_csr();
    let counts = &incidence.transpose_view().to_csr() * &incidence;

    let mut dense = Array2::zeros((n_clusters, n_clusters));
    for (value, (i, j)) in counts.iter() {
        dense[(i, j)] = value.ln_1p();
    }
    dense
}
