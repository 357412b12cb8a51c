//! Nutrition-profile features from the seven-value nutrition tuple.
//!
//! Tuple layout: calories, fat, sugar, sodium, protein, saturated fat,
//! carbohydrates (all but calories as percent daily value). Ratios use a
//! +1 denominator so zero-calorie rows stay finite.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::analysis::{
    AnalysisError, AnalysisResult, Analyser, CleaningStrategy, apply_cleaning,
};
use crate::schema::records::{Interaction, Recipe};
use crate::util::frame::{FeatureFrame, fmt_cell};

const ANALYSER: &str = "nutrition";
const TUPLE_LEN: usize = 7;

const COLUMNS: [&str; 5] = [
    "name",
    "energy_density",
    "protein_ratio",
    "fat_ratio",
    "nutrient_balance_index",
];

pub struct NutritionAnalyser {
    cleaning: Option<Arc<dyn CleaningStrategy>>,
}

impl NutritionAnalyser {
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

impl Default for NutritionAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyser for NutritionAnalyser {
    fn name(&self) -> &'static str {
        ANALYSER
    }

    fn analyze(
        &self,
        recipes: &[Recipe],
        interactions: &[Interaction],
    ) -> Result<AnalysisResult, AnalysisError> {
        let (recipes, _) = apply_cleaning(self.cleaning.as_ref(), recipes, interactions);

        if !recipes.is_empty() && recipes.iter().all(|r| r.nutrition.is_none()) {
            return Err(AnalysisError::MissingColumn {
                analyser: ANALYSER,
                column: "nutrition",
            });
        }

        let mut table = FeatureFrame::new(COLUMNS.iter().map(ToString::to_string).collect());
        for recipe in recipes.iter() {
            let raw = recipe.nutrition.as_deref().unwrap_or_default();
            let values = recipe.nutrition_values().filter(|v| v.len() == TUPLE_LEN).ok_or(
                AnalysisError::MalformedValue {
                    analyser: ANALYSER,
                    column: "nutrition",
                    value: raw.to_string(),
                },
            )?;

            let [calories, fat, sugar, sodium, protein, _sat_fat, carbs] =
                [values[0], values[1], values[2], values[3], values[4], values[5], values[6]];

            let energy_density = calories / (carbs + protein + fat + 1.0);
            let protein_ratio = protein / (calories + 1.0);
            let fat_ratio = fat / (calories + 1.0);
            let balance = (protein - (fat + sugar + sodium) / 3.0) / (calories + 1.0);

            table.push_row(
                recipe.id,
                vec![
                    recipe.name.clone().unwrap_or_default(),
                    fmt_cell(energy_density),
                    fmt_cell(protein_ratio),
                    fmt_cell(fat_ratio),
                    fmt_cell(balance),
                ],
            )?;
        }

        let mut summary = BTreeMap::new();
        summary.insert("n_recipes".to_string(), table.len() as f64);

        Ok(AnalysisResult { table, summary })
    }
}
