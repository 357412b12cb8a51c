//! Seasonality features from interaction dates.
//!
//! Each interaction date maps to a point on the unit circle through its day
//! of year. Per-recipe mean sin/cos vectors are shrunk toward the global
//! mean with empirical-Bayes smoothing so recipes with few interactions do
//! not get an artificially sharp season. Strength is the magnitude of the
//! smoothed vector: near 0 means year-round, near 1 means one tight season.

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::analysis::{
    AnalysisError, AnalysisResult, Analyser, CleaningStrategy, apply_cleaning,
};
use crate::schema::records::{Interaction, Recipe};
use crate::util::frame::{FeatureFrame, fmt_cell};

const ANALYSER: &str = "seasonality";
const DAYS_PER_YEAR: f64 = 365.0;

const COLUMNS: [&str; 3] = [
    "inter_doy_sin_smooth",
    "inter_doy_cos_smooth",
    "inter_strength",
];

pub struct SeasonalityAnalyser {
    smoothing: f64,
    cleaning: Option<Arc<dyn CleaningStrategy>>,
}

impl SeasonalityAnalyser {
    #[must_use]
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing,
            cleaning: None,
        }
    }

    #[must_use]
    pub fn with_cleaning(mut self, cleaning: Arc<dyn CleaningStrategy>) -> Self {
        self.cleaning = Some(cleaning);
        self
    }
}

impl Analyser for SeasonalityAnalyser {
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
            if interactions.iter().all(|i| i.date.is_none()) {
                return Err(AnalysisError::MissingColumn {
                    analyser: ANALYSER,
                    column: "date",
                });
            }
        }

        // Per-recipe sums of the circular encoding.
        let mut sums: BTreeMap<i64, (f64, f64, usize)> = BTreeMap::new();
        let mut global_sin = 0.0;
        let mut global_cos = 0.0;
        let mut global_n = 0usize;

        for interaction in interactions.iter() {
            let Some(recipe_id) = interaction.recipe_id else {
                continue;
            };
            let Some(raw_date) = interaction.date.as_deref() else {
                continue;
            };
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
                AnalysisError::MalformedValue {
                    analyser: ANALYSER,
                    column: "date",
                    value: raw_date.to_string(),
                }
            })?;

            let angle = TAU * f64::from(date.ordinal()) / DAYS_PER_YEAR;
            let entry = sums.entry(recipe_id).or_insert((0.0, 0.0, 0));
            entry.0 += angle.sin();
            entry.1 += angle.cos();
            entry.2 += 1;
            global_sin += angle.sin();
            global_cos += angle.cos();
            global_n += 1;
        }

        let global_mean_sin = if global_n > 0 {
            global_sin / global_n as f64
        } else {
            0.0
        };
        let global_mean_cos = if global_n > 0 {
            global_cos / global_n as f64
        } else {
            0.0
        };

        let k = self.smoothing;
        let mut table = FeatureFrame::new(COLUMNS.iter().map(ToString::to_string).collect());
        for recipe in recipes.iter() {
            let (sum_sin, sum_cos, n) = sums.get(&recipe.id).copied().unwrap_or((0.0, 0.0, 0));
            let n_f = n as f64;
            let (local_sin, local_cos) = if n > 0 {
                (sum_sin / n_f, sum_cos / n_f)
            } else {
                (0.0, 0.0)
            };

            let sin_smooth = (n_f * local_sin + k * global_mean_sin) / (n_f + k);
            let cos_smooth = (n_f * local_cos + k * global_mean_cos) / (n_f + k);
            let strength = sin_smooth.hypot(cos_smooth);

            table.push_row(
                recipe.id,
                vec![fmt_cell(sin_smooth), fmt_cell(cos_smooth), fmt_cell(strength)],
            )?;
        }

        let mut summary = BTreeMap::new();
        summary.insert("global_mean_sin".to_string(), global_mean_sin);
        summary.insert("global_mean_cos".to_string(), global_mean_cos);
        summary.insert("smoothing".to_string(), k);

        Ok(AnalysisResult { table, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: i64) -> Recipe {
        Recipe {
            id,
            name: None,
            minutes: None,
            n_steps: None,
            n_ingredients: None,
            nutrition: None,
            ingredients: None,
            tags: None,
        }
    }

    fn interaction(recipe_id: i64, date: &str) -> Interaction {
        Interaction {
            recipe_id: Some(recipe_id),
            rating: Some(5.0),
            date: Some(date.to_string()),
        }
    }

    #[test]
    fn concentrated_season_beats_uniform_spread() {
        let recipes = vec![recipe(1), recipe(2)];
        let mut interactions = Vec::new();
        // Recipe 1: every interaction in late December.
        for day in 20..30 {
            interactions.push(interaction(1, &format!("2020-12-{day:02}")));
        }
        // Recipe 2: spread across the whole year.
        for month in 1..=12 {
            interactions.push(interaction(2, &format!("2020-{month:02}-15")));
        }

        let result = SeasonalityAnalyser::new(5.0)
            .analyze(&recipes, &interactions)
            .expect("analysis");

        let strength = result.table.numeric_column("inter_strength").expect("column");
        assert!(strength[0] > strength[1]);
        for s in &strength {
            assert!((0.0..=1.0).contains(s));
        }
    }

    #[test]
    fn recipe_without_interactions_gets_the_global_season() {
        let recipes = vec![recipe(1), recipe(2)];
        let interactions = vec![interaction(1, "2020-07-01"), interaction(1, "2020-07-02")];

        let result = SeasonalityAnalyser::new(5.0)
            .analyze(&recipes, &interactions)
            .expect("analysis");

        let sin = result
            .table
            .numeric_column("inter_doy_sin_smooth")
            .expect("column");
        assert!((sin[1] - result.summary["global_mean_sin"]).abs() < 1e-12);
    }

    #[test]
    fn malformed_date_is_an_error() {
        let recipes = vec![recipe(1)];
        let interactions = vec![interaction(1, "01/07/2020")];

        let err = SeasonalityAnalyser::new(5.0)
            .analyze(&recipes, &interactions)
            .expect_err("bad date");
        assert!(err.to_string().contains("01/07/2020"));
    }

    #[test]
    fn all_none_dates_is_a_missing_column() {
        let recipes = vec![recipe(1)];
        let interactions = vec![Interaction {
            recipe_id: Some(1),
            rating: Some(5.0),
            date: None,
        }];

        let err = SeasonalityAnalyser::new(5.0)
            .analyze(&recipes, &interactions)
            .expect_err("missing column");
        assert!(err.to_string().contains("date"));
    }
}
