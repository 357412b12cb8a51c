//! Raw input rows as they appear in the source CSV extracts.
//!
//! Every non-id field is optional: the CSV deserializer fills `None` for an
//! absent column, and each analyser decides which columns it requires. An
//! all-`None` column across every row is how a missing input column shows up
//! downstream.

use serde::Deserialize;

/// One recipe row from the recipes extract.
#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub minutes: Option<f64>,
    #[serde(default)]
    pub n_steps: Option<f64>,
    #[serde(default)]
    pub n_ingredients: Option<f64>,
    /// Python-style list literal of seven floats.
    #[serde(default)]
    pub nutrition: Option<String>,
    /// Python-style list literal of ingredient names.
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

/// One user interaction row from the interactions extract.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub recipe_id: Option<i64>,
    /// 0 means "reviewed without a star rating".
    #[serde(default)]
    pub rating: Option<f64>,
    /// ISO date `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
}

impl Recipe {
    /// Parsed ingredient list, `None` when the column is absent or the cell
    /// is not a list literal.
    #[must_use]
    pub fn ingredient_list(&self) -> Option<Vec<String>> {
        self.ingredients
            .as_deref()
            .and_then(crate::util::pylist::parse_str_list)
    }

    /// Parsed nutrition tuple, `None` when absent or malformed.
    #[must_use]
    pub fn nutrition_values(&self) -> Option<Vec<f64>> {
        self.nutrition
            .as_deref()
            .and_then(crate::util::pylist::parse_f64_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_list_parses_quoted_literal() {
        let recipe = Recipe {
            id: 1,
            name: None,
            minutes: None,
            n_steps: None,
            n_ingredients: None,
            nutrition: None,
            ingredients: Some("['winter squash', 'mexican seasoning']".to_string()),
            tags: None,
        };
        assert_eq!(
            recipe.ingredient_list(),
            Some(vec![
                "winter squash".to_string(),
                "mexican seasoning".to_string()
            ])
        );
    }

    #[test]
    fn nutrition_values_parses_seven_tuple() {
        let recipe = Recipe {
            id: 1,
            name: None,
            minutes: None,
            n_steps: None,
            n_ingredients: None,
            nutrition: Some("[51.5, 0.0, 13.0, 0.0, 2.0, 0.0, 4.0]".to_string()),
            ingredients: None,
            tags: None,
        };
        let values = recipe.nutrition_values().expect("tuple");
        assert_eq!(values.len(), 7);
        assert!((values[0] - 51.5).abs() < f64::EPSILON);
    }
}
