//! Rating popularity features: interaction counts, rating moments, a
//! Bayesian shrunk mean and Wilson bounds on the rated share.
//!
//! A rating of 0 is a review without stars; only strictly positive ratings
//! count as "rated". The Bayes prior mean is a percentile of the pooled
//! rated distribution and the prior weight is the median per-recipe rated
//! count, floored so sparsely rated recipes shrink hard toward the prior.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::analysis::{
    AnalysisError, AnalysisResult, Analyser, CleaningStrategy, apply_cleaning,
};
use crate::schema::records::{Interaction, Recipe};
use crate::util::frame::{FeatureFrame, fmt_cell};
use crate::util::stats;

const ANALYSER: &str = "rating";
/// Minimum prior weight for the Bayesian mean.
const MIN_PRIOR_WEIGHT: f64 = 5.0;
/// z for a 95% Wilson interval.
const WILSON_Z: f64 = 1.96;

const COLUMNS: [&str; 9] = [
    "n_interactions",
    "n_rated",
    "share_rated",
    "mean_rating",
    "median_rating",
    "rating_std",
    "bayes_mean",
    "wilson_low",
    "wilson_high",
];

pub struct RatingAnalyser {
    mu_percentile: f64,
    cleaning: Option<Arc<dyn CleaningStrategy>>,
}

impl RatingAnalyser {
    #[must_use]
    pub fn new(mu_percentile: f64) -> Self {
        Self {
            mu_percentile,
            cleaning: None,
        }
    }

    #[must_use]
    pub fn with_cleaning(mut self, cleaning: Arc<dyn CleaningStrategy>) -> Self {
        self.cleaning = Some(cleaning);
        self
    }
}

impl Analyser for RatingAnalyser {
    fn name(&self) -> &'static str {
        ANALYSER
    }

    fn analyze(
        &self,
        recipes: &[Recipe],
        interactions: &[Interaction],
    ) -> Result<AnalysisResult, AnalysisError> {
        let (recipes, interactions) = apply_cleaning(self.cleaning.as_ref(), recipes, interactions);

        if !interactions.is_empty() {
            if interactions.iter().all(|i| i.recipe_id.is_none()) {
                return Err(AnalysisError::MissingColumn {
                    analyser: ANALYSER,
                    column: "recipe_id",
                });
            }
            if interactions.iter().all(|i| i.rating.is_none()) {
                return Err(AnalysisError::MissingColumn {
                    analyser: ANALYSER,
                    column: "rating",
                });
            }
        }

        // Ratings grouped per recipe; a missing rating cell counts as 0.
        let mut by_recipe: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for interaction in interactions.iter() {
            if let Some(recipe_id) = interaction.recipe_id {
                by_recipe
                    .entry(recipe_id)
                    .or_default()
                    .push(interaction.rating.unwrap_or(0.0));
            }
        }

        let pooled_rated: Vec<f64> = by_recipe
            .values()
            .flatten()
            .copied()
            .filter(|r| *r > 0.0)
            .collect();
        let rated_counts: Vec<f64> = by_recipe
            .values()
            .map(|rs| rs.iter().filter(|r| **r > 0.0).count() as f64)
            .collect();

        let mu_prior = if pooled_rated.is_empty() {
            0.0
        } else {
            stats::quantile(&pooled_rated, self.mu_percentile)
        };
        let prior_weight = if rated_counts.is_empty() {
            MIN_PRIOR_WEIGHT
        } else {
            stats::median(&rated_counts).max(MIN_PRIOR_WEIGHT)
        };

        let mut table = FeatureFrame::new(COLUMNS.iter().map(ToString::to_string).collect());
        for recipe in recipes.iter() {
            let empty = Vec::new();
            let ratings = by_recipe.get(&recipe.id).unwrap_or(&empty);
            let rated: Vec<f64> = ratings.iter().copied().filter(|r| *r > 0.0).collect();

            let n_interactions = ratings.len() as f64;
            let n_rated = rated.len() as f64;
            let share_rated = if ratings.is_empty() {
                0.0
            } else {
                n_rated / n_interactions
            };

            // With no rated interactions the posterior is exactly the prior.
            let bayes_mean = if rated.is_empty() {
                mu_prior
            } else {
                (mu_prior * prior_weight + rated.iter().sum::<f64>()) / (prior_weight + n_rated)
            };

            // Wilson interval on the rated share itself.
            let (wilson_low, wilson_high) = wilson_bounds(rated.len(), ratings.len());

            table.push_row(
                recipe.id,
                vec![
                    fmt_cell(n_interactions),
                    fmt_cell(n_rated),
                    fmt_cell(share_rated),
                    fmt_cell(stats::mean(&rated)),
                    fmt_cell(stats::median(&rated)),
                    fmt_cell(stats::sample_std(&rated)),
                    fmt_cell(bayes_mean),
                    fmt_cell(wilson_low),
                    fmt_cell(wilson_high),
                ],
            )?;
        }

        let mut summary = BTreeMap::new();
        summary.insert("mu_prior".to_string(), mu_prior);
        summary.insert("prior_weight".to_string(), prior_weight);
        summary.insert("n_rated_total".to_string(), pooled_rated.len() as f64);

        Ok(AnalysisResult { table, summary })
    }
}

/// 95% Wilson score interval for `successes` out of `n`; NaN bounds when
/// there are no trials.
fn wilson_bounds(successes: usize, n: usize) -> (f64, f64) {
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let n = n as f64;
    let p = successes as f64 / n;
    let z2 = WILSON_Z * WILSON_Z;
    let denom = 1.0 + z2 / n;
    let center = p + z2 / (2.0 * n);
    let margin = WILSON_Z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    (((center - margin) / denom).max(0.0), ((center + margin) / denom).min(1.0))
}
