//! The feature contract between the analysers and the clustering stage.

/// Numeric columns the merged table must carry before scaling and PCA.
///
/// Grouped by producing analyser: nutrition, seasonality, rating,
/// complexity, then the seven ingredient axis scores. The clustering
/// matrix is assembled in exactly this column order.
pub const REQUIRED_FEATURES: [&str; 19] = [
    "energy_density",
    "protein_ratio",
    "fat_ratio",
    "nutrient_balance_index",
    "inter_doy_sin_smooth",
    "inter_doy_cos_smooth",
    "inter_strength",
    "n_interactions",
    "bayes_mean",
    "n_steps_z",
    "n_ingredients_z",
    "minutes_log",
    "score_sweet_savory",
    "score_spicy_mild",
    "score_lowcal_rich",
    "score_vegetarian_meat",
    "score_solid_liquid",
    "score_raw_processed",
    "score_western_exotic",
];

/// Analyser table names; `<name>_table.csv` on disk, joined in this order.
pub const INPUT_TABLES: [&str; 5] = [
    "nutrition",
    "seasonality",
    "rating",
    "complexity",
    "ingredients",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_features_are_unique() {
        let mut seen = std::collections::BTreeSet::new();
        for name in REQUIRED_FEATURES {
            assert!(seen.insert(name), "duplicate feature {name}");
        }
    }
}
