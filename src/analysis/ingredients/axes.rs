//! Anchor phrases for the seven semantic flavor axes.
//!
//! Each axis is scored against the difference of the two anchor embeddings,
//! positive pole minus negative pole, so a positive score leans toward the
//! first phrase.

/// `(axis name, positive anchor, negative anchor)`.
pub const AXES: [(&str, &str, &str); 7] = [
    ("sweet_savory", "sweet dessert flavor", "savory meal flavor"),
    ("spicy_mild", "spicy hot food", "mild gentle flavor"),
    ("lowcal_rich", "low-calorie healthy food", "rich and fatty dish"),
    (
        "vegetarian_meat",
        "vegetarian food without meat",
        "meat-based dish",
    ),
    ("solid_liquid", "solid food", "liquid food or drink"),
    (
        "raw_processed",
        "raw natural ingredient",
        "processed or prepared food",
    ),
    ("western_exotic", "typical western food", "exotic or asian food"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_names_are_unique() {
        let mut seen = std::collections::BTreeSet::new();
        for (name, _, _) in AXES {
            assert!(seen.insert(name));
        }
    }
}
