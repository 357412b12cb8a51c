//! Feature analysers: each one turns the raw recipes and interactions into
//! a per-recipe feature table plus a small summary of fitted statistics.

pub mod complexity;
pub mod ingredients;
pub mod nutrition;
pub mod rating;
pub mod seasonality;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::schema::records::{Interaction, Recipe};
use crate::util::frame::{FeatureFrame, FrameError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{analyser}: missing required column '{column}'")]
    MissingColumn {
        analyser: &'static str,
        column: &'static str,
    },
    #[error("{analyser}: malformed value {value:?} in column '{column}'")]
    MalformedValue {
        analyser: &'static str,
        column: &'static str,
        value: String,
    },
    #[error("{analyser}: embedding failed: {source}")]
    Embedding {
        analyser: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Output of one analyser: the per-recipe table and the scalar statistics
/// fitted while building it (priors, quantile cuts, vocabulary size).
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub table: FeatureFrame,
    pub summary: BTreeMap<String, f64>,
}

/// One feature-extraction stage. Implementations must be pure functions of
/// their input so the pipeline can fan them out across threads.
pub trait Analyser: Send + Sync {
    fn name(&self) -> &'static str;

    fn analyze(
        &self,
        recipes: &[Recipe],
        interactions: &[Interaction],
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Optional per-analyser input filter, applied before feature extraction.
///
/// The default pipeline runs without one; tests and downstream deployments
/// can plug in deduplication or outlier removal here.
pub trait CleaningStrategy: Send + Sync {
    fn clean<'a>(
        &self,
        recipes: &'a [Recipe],
        interactions: &'a [Interaction],
    ) -> (Cow<'a, [Recipe]>, Cow<'a, [Interaction]>);
}

/// Pass-through cleaning: borrows the input untouched.
#[derive(Debug, Clone, Default)]
pub struct NoCleaning;

impl CleaningStrategy for NoCleaning {
    fn clean<'a>(
        &self,
        recipes: &'a [Recipe],
        interactions: &'a [Interaction],
    ) -> (Cow<'a, [Recipe]>, Cow<'a, [Interaction]>) {
        (Cow::Borrowed(recipes), Cow::Borrowed(interactions))
    }
}

pub(crate) fn apply_cleaning<'a>(
    cleaning: Option<&Arc<dyn CleaningStrategy>>,
    recipes: &'a [Recipe],
    interactions: &'a [Interaction],
) -> (Cow<'a, [Recipe]>, Cow<'a, [Interaction]>) {
    match cleaning {
        Some(strategy) => strategy.clean(recipes, interactions),
        None => (Cow::Borrowed(recipes), Cow::Borrowed(interactions)),
    }
}
