//! Scale, project, and cluster the merged feature table.
//!
//! The matrix is assembled in the fixed feature order, standardized, fully
//! re-based with PCA, then K-Means runs on the leading principal
//! components. Rows with any non-finite feature are dropped (with a count
//! in the log) instead of poisoning the scaler.

use ndarray::Array2;
use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::PipelineSettings;
use crate::schema::features::REQUIRED_FEATURES;
use crate::util::frame::{FeatureFrame, FrameError};
use crate::util::kmeans::KMeans;
use crate::util::pca::Pca;
use crate::util::scale::StandardScaler;

#[derive(Debug, Error)]
pub enum ClusteringError {
    #[error("no finite feature rows left to cluster")]
    NoRows,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// One output row of the typology table.
#[derive(Debug, Clone)]
pub struct ClusterRow {
    pub id: i64,
    pub name: String,
    pub cluster: usize,
    pub pc_1: f64,
    pub pc_2: f64,
}

#[derive(Debug, Clone)]
pub struct ClusteringOutput {
    pub rows: Vec<ClusterRow>,
    pub explained_variance: Vec<f64>,
    pub dropped_rows: usize,
}

/// Cluster the merged table per the settings.
pub fn cluster(
    merged: &FeatureFrame,
    settings: &PipelineSettings,
) -> Result<ClusteringOutput, ClusteringError> {
    // Columns in contract order, all aligned on ascending recipe id.
    let mut columns = Vec::with_capacity(REQUIRED_FEATURES.len());
    for feature in REQUIRED_FEATURES {
        columns.push(merged.numeric_column(feature)?);
    }
    let ids: Vec<i64> = merged.ids().collect();

    let mut kept_ids = Vec::with_capacity(ids.len());
    let mut kept_rows: Vec<Vec<f64>> = Vec::with_capacity(ids.len());
    let mut dropped_rows = 0usize;
    for (row, &id) in ids.iter().enumerate() {
        let values: Vec<f64> = columns.iter().map(|c| c[row]).collect();
        if values.iter().all(|v| v.is_finite()) {
            kept_ids.push(id);
            kept_rows.push(values);
        } else {
            dropped_rows += 1;
        }
    }
    if dropped_rows > 0 {
        warn!(dropped = dropped_rows, "dropped rows with non-finite features");
    }
    if kept_rows.is_empty() {
        return Err(ClusteringError::NoRows);
    }

    let n_features = REQUIRED_FEATURES.len();
    let mut matrix = Array2::zeros((kept_rows.len(), n_features));
    for (i, row) in kept_rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            matrix[(i, j)] = *value;
        }
    }

    let scaler = StandardScaler::fit(&matrix);
    let scaled = scaler.transform(&matrix);

    // Full re-basis, then K-Means on the leading components only.
    let pca = Pca::fit(&scaled, n_features);
    let projected = pca.transform(&scaled);
    let n_pcs = settings.kmeans_pcs.min(pca.n_components()).max(1);

    let points: Vec<Vec<f64>> = projected
        .rows()
        .into_iter()
        .map(|row| row.iter().take(n_pcs).copied().collect())
        .collect();
    let model = KMeans::fit(
        &points,
        settings.kmeans_clusters,
        settings.kmeans_max_iterations,
        settings.random_seed,
    );

    info!(
        rows = kept_ids.len(),
        components = pca.n_components(),
        kmeans_pcs = n_pcs,
        clusters = model.centroids.len(),
        "clustering finished"
    );

    let rows = kept_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| ClusterRow {
            id,
            name: merged.cell(id, "name").unwrap_or_default().to_string(),
            cluster: model.assignments[i],
            pc_1: projected[(i, 0)],
            pc_2: if pca.n_components() > 1 {
                projected[(i, 1)]
            } else {
                0.0
            },
        })
        .collect();

    Ok(ClusteringOutput {
        rows,
        explained_variance: pca.explained_variance().to_vec(),
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PipelineSettings {
        PipelineSettings {
            features_dir: std::path::PathBuf::new(),
            clustering_dir: std::path::PathBuf::new(),
            kmeans_clusters: 2,
            kmeans_pcs: 12,
            kmeans_max_iterations: 300,
            random_seed: 42,
            seasonality_smoothing: 5.0,
            rating_mu_percentile: 0.5,
            ingredient_cluster_threshold: 0.5,
            cooc_pca_components: 10,
            cooc_excluded_dims: vec![1, 3],
            parallel_analysers: false,
        }
    }

    fn merged_fixture(values: &[(i64, f64)]) -> FeatureFrame {
        let mut columns = vec!["name".to_string()];
        columns.extend(REQUIRED_FEATURES.iter().map(ToString::to_string));
        let mut frame = FeatureFrame::new(columns);
        for (id, base) in values {
            let mut cells = vec![format!("recipe {id}")];
            for (j, _) in REQUIRED_FEATURES.iter().enumerate() {
                cells.push(format!("{}", base + j as f64 * 0.1));
            }
            frame.push_row(*id, cells).expect("row");
        }
        frame
    }

    #[test]
    fn separates_two_groups_and_keeps_ids() {
        let merged = merged_fixture(&[
            (1, 0.0),
            (2, 0.1),
            (3, 0.05),
            (4, 100.0),
            (5, 100.1),
            (6, 99.9),
        ]);
        let output = cluster(&merged, &settings()).expect("clustering");

        assert_eq!(output.rows.len(), 6);
        assert_eq!(output.rows[0].id, 1);
        assert_eq!(output.rows[0].cluster, output.rows[1].cluster);
        assert_ne!(output.rows[0].cluster, output.rows[3].cluster);
        assert_eq!(output.rows[0].name, "recipe 1");
    }

    #[test]
    fn non_finite_rows_are_dropped_not_fatal() {
        let mut merged = merged_fixture(&[(1, 0.0), (2, 1.0), (3, 2.0)]);
        let mut cells = vec!["broken".to_string()];
        cells.push(String::new());
        cells.extend((1..REQUIRED_FEATURES.len()).map(|j| format!("{j}")));
        merged.push_row(9, cells).expect("row");

        let output = cluster(&merged, &settings()).expect("clustering");
        assert_eq!(output.dropped_rows, 1);
        assert!(output.rows.iter().all(|r| r.id != 9));
    }

    #[test]
    fn all_rows_non_finite_is_an_error() {
        let mut columns = vec!["name".to_string()];
        columns.extend(REQUIRED_FEATURES.iter().map(ToString::to_string));
        let mut frame = FeatureFrame::new(columns);
        let mut cells = vec!["x".to_string()];
        cells.extend(std::iter::repeat_n(String::new(), REQUIRED_FEATURES.len()));
        frame.push_row(1, cells).expect("row");

        let err = cluster(&frame, &settings()).expect_err("no usable rows");
        assert!(matches!(err, ClusteringError::NoRows));
    }

    #[test]
    fn same_input_same_seed_is_reproducible() {
        let merged = merged_fixture(&[(1, 0.0), (2, 5.0), (3, 10.0), (4, 15.0)]);
        let a = cluster(&merged, &settings()).expect("clustering");
        let b = cluster(&merged, &settings()).expect("clustering");

        let clusters_a: Vec<usize> = a.rows.iter().map(|r| r.cluster).collect();
        let clusters_b: Vec<usize> = b.rows.iter().map(|r| r.cluster).collect();
        assert_eq!(clusters_a, clusters_b);
    }
}
