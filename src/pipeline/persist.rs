//! CSV artifact writing: analyser tables and summaries, the merged feature
//! table, and the final typology output.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::pipeline::clustering::ClusterRow;
use crate::util::frame::{FeatureFrame, FrameError, fmt_cell};

/// File name of the final clustering artifact.
pub const CLUSTERING_FILE: &str = "recipes_clustering_with_pca.csv";
/// File name of the merged feature table.
pub const MERGED_FILE: &str = "merged_features.csv";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Write `<name>_table.csv` and `<name>_summary.csv` for one analyser.
pub fn write_analysis(
    features_dir: &Path,
    name: &str,
    result: &AnalysisResult,
) -> Result<(), PersistError> {
    let table_path = features_dir.join(format!("{name}_table.csv"));
    result.table.to_csv(&table_path, "id")?;
    debug!(path = %table_path.display(), rows = result.table.len(), "wrote table");

    let summary_path = features_dir.join(format!("{name}_summary.csv"));
    write_summary(&summary_path, &result.summary)
}

/// Write the merged features keyed by recipe id.
pub fn write_merged(clustering_dir: &Path, merged: &FeatureFrame) -> Result<(), PersistError> {
    let path = clustering_dir.join(MERGED_FILE);
    merged.to_csv(&path, "id")?;
    debug!(path = %path.display(), rows = merged.len(), "wrote merged features");
    Ok(())
}

/// Write the final typology table: id, name, cluster, first two PCs.
pub fn write_clustering(clustering_dir: &Path, rows: &[ClusterRow]) -> Result<(), PersistError> {
    let path = clustering_dir.join(CLUSTERING_FILE);
    let display = path.display().to_string();
    let mut writer = csv::Writer::from_path(&path).map_err(|source| PersistError::Write {
        path: display.clone(),
        source,
    })?;

    let write = |writer: &mut csv::Writer<std::fs::File>,
                 record: &[String]|
     -> Result<(), PersistError> {
        writer
            .write_record(record)
            .map_err(|source| PersistError::Write {
                path: display.clone(),
                source,
            })
    };

    write(
        &mut writer,
        &["id", "name", "cluster", "pc_1", "pc_2"].map(ToString::to_string),
    )?;
    for row in rows {
        write(
            &mut writer,
            &[
                row.id.to_string(),
                row.name.clone(),
                row.cluster.to_string(),
                fmt_cell(row.pc_1),
                fmt_cell(row.pc_2),
            ],
        )?;
    }
    writer.flush().map_err(|source| PersistError::Write {
        path: display,
        source: csv::Error::from(source),
    })?;
    debug!(path = %path.display(), rows = rows.len(), "wrote clustering output");
    Ok(())
}

/// Melt the fitted statistics into a two-column `metric,value` CSV.
fn write_summary(path: &Path, summary: &BTreeMap<String, f64>) -> Result<(), PersistError> {
    let display = path.display().to_string();
    let mut writer = csv::Writer::from_path(path).map_err(|source| PersistError::Write {
        path: display.clone(),
        source,
    })?;

    let mut write = |record: &[String]| -> Result<(), PersistError> {
        writer
            .write_record(record)
            .map_err(|source| PersistError::Write {
                path: display.clone(),
                source,
            })
    };
    write(&["metric".to_string(), "value".to_string()])?;
    for (metric, value) in summary {
        write(&[metric.clone(), fmt_cell(*value)])?;
    }
    drop(write);
    writer.flush().map_err(|source| PersistError::Write {
        path: display,
        source: csv::Error::from(source),
    })
}
