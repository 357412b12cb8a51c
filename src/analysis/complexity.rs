//! Preparation-complexity features: log time, population z-scores, and a
//! coarse 3x3 bucket over step and ingredient tertiles with French labels.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::analysis::{
    AnalysisError, AnalysisResult, Analyser, CleaningStrategy, apply_cleaning,
};
use crate::schema::records::{Interaction, Recipe};
use crate::util::frame::{FeatureFrame, fmt_cell};
use crate::util::stats;

const ANALYSER: &str = "complexity";

const COLUMNS: [&str; 9] = [
    "minutes",
    "n_steps",
    "n_ingredients",
    "minutes_z",
    "n_steps_z",
    "n_ingredients_z",
    "minutes_log",
    "cluster_ing_steps",
    "cluster_label_ing_steps",
];

/// Bucket labels: step tertile first (simple / intermédiaire / complexe),
/// ingredient tertile second (faible / moyen / élevé).
const BUCKET_LABELS: [(&str, &str); 9] = [
    ("0_0", "simple faible"),
    ("0_1", "simple moyen"),
    ("0_2", "simple élevé"),
    ("1_0", "intermédiaire faible"),
    ("1_1", "intermédiaire moyen"),
    ("1_2", "intermédiaire élevé"),
    ("2_0", "complexe faible"),
    ("2_1", "complexe moyen"),
    ("2_2", "complexe élevé"),
];

pub struct ComplexityAnalyser {
    cleaning: Option<Arc<dyn CleaningStrategy>>,
}

impl ComplexityAnalyser {
    #[must_use]
    pub fn new() -> Self {
        Self { cleaning: None }
    }

    #[must_use]
    pub fn with_cleaning(mut self, cleaning: Arc<dyn CleaningStrategy>) -> Self {
        self.cleaning = Some(cleaning);
        self
    }
}

impl Default for ComplexityAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyser for ComplexityAnalyser {
    fn name(&self) -> &'static str {
        ANALYSER
    }

    fn analyze(
        &self,
        recipes: &[Recipe],
        interactions: &[Interaction],
    ) -> Result<AnalysisResult, AnalysisError> {
        let (recipes, _) = apply_cleaning(self.cleaning.as_ref(), recipes, interactions);

        let minutes = required_column(&recipes, "minutes", |r| r.minutes)?;
        let n_steps = required_column(&recipes, "n_steps", |r| r.n_steps)?;
        let n_ingredients = required_column(&recipes, "n_ingredients", |r| r.n_ingredients)?;

        let minutes_mean = stats::mean(&minutes);
        let minutes_std = stats::population_std(&minutes);
        let steps_mean = stats::mean(&n_steps);
        let steps_std = stats::population_std(&n_steps);
        let ing_mean = stats::mean(&n_ingredients);
        let ing_std = stats::population_std(&n_ingredients);

        let steps_low = stats::quantile(&n_steps, 1.0 / 3.0);
        let steps_high = stats::quantile(&n_steps, 2.0 / 3.0);
        let ing_low = stats::quantile(&n_ingredients, 1.0 / 3.0);
        let ing_high = stats::quantile(&n_ingredients, 2.0 / 3.0);

        let labels: BTreeMap<&str, &str> = BUCKET_LABELS.iter().copied().collect();

        let mut table = FeatureFrame::new(COLUMNS.iter().map(ToString::to_string).collect());
        for (i, recipe) in recipes.iter().enumerate() {
            let steps_bucket = tertile(n_steps[i], steps_low, steps_high);
            let ing_bucket = tertile(n_ingredients[i], ing_low, ing_high);
            let bucket = format!("{steps_bucket}_{ing_bucket}");
            let label = labels.get(bucket.as_str()).copied().unwrap_or_default();

            table.push_row(
                recipe.id,
                vec![
                    fmt_cell(minutes[i]),
                    fmt_cell(n_steps[i]),
                    fmt_cell(n_ingredients[i]),
                    fmt_cell(z_score(minutes[i], minutes_mean, minutes_std)),
                    fmt_cell(z_score(n_steps[i], steps_mean, steps_std)),
                    fmt_cell(z_score(n_ingredients[i], ing_mean, ing_std)),
                    fmt_cell((1.0 + minutes[i]).ln()),
                    bucket,
                    label.to_string(),
                ],
            )?;
        }

        let mut summary = BTreeMap::new();
        summary.insert("minutes_mean".to_string(), minutes_mean);
        summary.insert("minutes_std".to_string(), minutes_std);
        summary.insert("n_steps_tertile_low".to_string(), steps_low);
        summary.insert("n_steps_tertile_high".to_string(), steps_high);
        summary.insert("n_ingredients_tertile_low".to_string(), ing_low);
        summary.insert("n_ingredients_tertile_high".to_string(), ing_high);

        Ok(AnalysisResult { table, summary })
    }
}

fn required_column(
    recipes: &[Recipe],
    column: &'static str,
    get: impl Fn(&Recipe) -> Option<f64>,
) -> Result<Vec<f64>, AnalysisError> {
    if !recipes.is_empty() && recipes.iter().all(|r| get(r).is_none()) {
        return Err(AnalysisError::MissingColumn {
            analyser: ANALYSER,
            column,
        });
    }
    recipes
        .iter()
        .map(|r| {
            get(r).ok_or(AnalysisError::MalformedValue {
                analyser: ANALYSER,
                column,
                value: String::new(),
            })
        })
        .collect()
}

fn z_score(value: f64, mean: f64, std: f64) -> f64 {
    if std > 0.0 { (value - mean) / std } else { 0.0 }
}

fn tertile(value: f64, low: f64, high: f64) -> usize {
    if value <= low {
        0
    } else if value <= high {
        1
    } else {
        2
    }
}
