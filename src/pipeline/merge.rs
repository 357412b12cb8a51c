//! Load the five persisted analyser tables, inner-join them on recipe id,
//! and validate the feature contract before anything numeric happens.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::schema::features::{INPUT_TABLES, REQUIRED_FEATURES};
use crate::util::frame::{FeatureFrame, FrameError};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("feature table '{name}' not found at {path}")]
    MissingTable { name: &'static str, path: String },
    #[error("merged table is missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
    #[error("merged table has no rows (no recipe id present in all five tables)")]
    EmptyIntersection,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Join the five tables in a fixed order and check the feature contract.
pub fn load_and_merge(features_dir: &Path) -> Result<FeatureFrame, MergeError> {
    let mut merged: Option<FeatureFrame> = None;
    for name in INPUT_TABLES {
        let path = features_dir.join(format!("{name}_table.csv"));
        if !path.exists() {
            return Err(MergeError::MissingTable {
                name,
                path: path.display().to_string(),
            });
        }
        let table = FeatureFrame::from_csv(&path)?;
        merged = Some(match merged {
            None => table,
            Some(acc) => acc.inner_join(&table),
        });
    }
    // INPUT_TABLES is non-empty, so merged is always set here.
    let merged = merged.unwrap_or_else(|| FeatureFrame::new(Vec::new()));

    validate(&merged)?;
    info!(
        rows = merged.len(),
        columns = merged.columns().len(),
        "merged feature tables"
    );
    Ok(merged)
}

/// Check that every clustering feature survived the join.
pub fn validate(merged: &FeatureFrame) -> Result<(), MergeError> {
    let missing: Vec<String> = REQUIRED_FEATURES
        .iter()
        .filter(|f| !merged.has_column(f))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(MergeError::MissingFeatures(missing));
    }
    if merged.is_empty() {
        return Err(MergeError::EmptyIntersection);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_lists_every_missing_feature() {
        let mut frame = FeatureFrame::new(
            REQUIRED_FEATURES
                .iter()
                .filter(|f| **f != "bayes_mean" && **f != "inter_strength")
                .map(ToString::to_string)
                .collect(),
        );
        frame
            .push_row(1, vec!["0".to_string(); REQUIRED_FEATURES.len() - 2])
            .expect("row");

        let err = validate(&frame).expect_err("missing features");
        let message = err.to_string();
        assert!(message.contains("bayes_mean"));
        assert!(message.contains("inter_strength"));
    }

    #[test]
    fn validate_rejects_empty_intersection() {
        let frame = FeatureFrame::new(
            REQUIRED_FEATURES.iter().map(ToString::to_string).collect(),
        );
        let err = validate(&frame).expect_err("empty");
        assert!(matches!(err, MergeError::EmptyIntersection));
    }

    #[test]
    fn load_and_merge_names_the_missing_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_and_merge(dir.path()).expect_err("nothing on disk");
        match err {
            MergeError::MissingTable { name, .. } => assert_eq!(name, "nutrition"),
            other => panic!("unexpected error {other}"),
        }
    }
}
