//! Ingredient semantics: embedding-based flavor axis scores, semantic
//! deduplication of the ingredient vocabulary, and latent co-occurrence
//! dimensions from a PCA of the cluster co-occurrence matrix.

pub mod axes;
pub mod cooccurrence;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::analysis::{
    AnalysisError, AnalysisResult, Analyser, CleaningStrategy, apply_cleaning,
};
use crate::embedding::{Embedder, cosine_similarity};
use crate::schema::records::{Interaction, Recipe};
use crate::util::frame::{FeatureFrame, fmt_cell};
use crate::util::pca::Pca;

const ANALYSER: &str = "ingredients";

pub struct IngredientsAnalyser {
    embedder: Arc<dyn Embedder>,
    /// Cosine-distance cutoff for merging vocabulary clusters.
    cluster_threshold: f32,
    n_pca_components: usize,
    /// 1-based latent dimensions left out of the output table.
    excluded_dims: Vec<usize>,
    cleaning: Option<Arc<dyn CleaningStrategy>>,
}

impl IngredientsAnalyser {
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        cluster_threshold: f32,
        n_pca_components: usize,
        excluded_dims: Vec<usize>,
    ) -> Self {
        Self {
            embedder,
            cluster_threshold,
            n_pca_components,
            excluded_dims,
            cleaning: None,
        }
    }

    #[must_use]
    pub fn with_cleaning(mut self, cleaning: Arc<dyn CleaningStrategy>) -> Self {
        self.cleaning = Some(cleaning);
        self
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AnalysisError> {
        self.embedder
            .encode(texts)
            .map_err(|source| AnalysisError::Embedding {
                analyser: ANALYSER,
                source,
            })
    }
}

impl Analyser for IngredientsAnalyser {
    fn name(&self) -> &'static str {
        ANALYSER
    }

    fn analyze(
        &self,
        recipes: &[Recipe],
        interactions: &[Interaction],
    ) -> Result<AnalysisResult, AnalysisError> {
        let (recipes, _) = apply_cleaning(self.cleaning.as_ref(), recipes, interactions);

        if !recipes.is_empty() && recipes.iter().all(|r| r.ingredients.is_none()) {
            return Err(AnalysisError::MissingColumn {
                analyser: ANALYSER,
                column: "ingredients",
            });
        }

        // Per-recipe token lists plus a first-appearance-ordered vocabulary.
        let mut vocab: Vec<String> = Vec::new();
        let mut vocab_index: BTreeMap<String, usize> = BTreeMap::new();
        let mut recipe_tokens: Vec<(i64, Vec<usize>)> = Vec::with_capacity(recipes.len());

        for recipe in recipes.iter() {
            // A missing or empty cell means "no ingredients" (NaN features
            // downstream); only a present, unparseable literal is an error.
            let tokens = match recipe.ingredients.as_deref() {
                None => Vec::new(),
                Some(raw) if raw.trim().is_empty() => Vec::new(),
                Some(raw) => {
                    recipe
                        .ingredient_list()
                        .ok_or_else(|| AnalysisError::MalformedValue {
                            analyser: ANALYSER,
                            column: "ingredients",
                            value: raw.to_string(),
                        })?
                }
            };
            let indices = tokens
                .iter()
                .map(|token| {
                    *vocab_index.entry(token.clone()).or_insert_with(|| {
                        vocab.push(token.clone());
                        vocab.len() - 1
                    })
                })
                .collect();
            recipe_tokens.push((recipe.id, indices));
        }

        let embeddings = self.embed(&vocab)?;

        // Semantic dedup of the vocabulary.
        let assignments = agglomerative_cosine(&embeddings, self.cluster_threshold);
        let n_clusters = assignments.iter().copied().max().map_or(0, |m| m + 1);
        let cluster_labels = label_clusters(&vocab, &recipe_tokens, &assignments, n_clusters);
        debug!(
            vocab = vocab.len(),
            clusters = n_clusters,
            sample = ?cluster_labels.iter().take(5).collect::<Vec<_>>(),
            "deduplicated ingredient vocabulary"
        );

        // Axis scores per vocabulary entry against pos-minus-neg directions.
        let mut axis_directions = Vec::with_capacity(axes::AXES.len());
        for (_, positive, negative) in axes::AXES {
            let anchors = self.embed(&[positive.to_string(), negative.to_string()])?;
            let direction: Vec<f32> = anchors[0]
                .iter()
                .zip(&anchors[1])
                .map(|(p, n)| p - n)
                .collect();
            axis_directions.push(direction);
        }
        let vocab_scores: Vec<Vec<f32>> = embeddings
            .iter()
            .map(|e| {
                axis_directions
                    .iter()
                    .map(|d| cosine_similarity(e, d))
                    .collect()
            })
            .collect();

        // Latent dimensions from the log co-occurrence of clusters.
        let recipe_clusters: Vec<BTreeSet<usize>> = recipe_tokens
            .iter()
            .map(|(_, tokens)| tokens.iter().map(|&t| assignments[t]).collect())
            .collect();
        let log_cooc = cooccurrence::log_cooccurrence(&recipe_clusters, n_clusters);
        let pca = Pca::fit(&log_cooc, self.n_pca_components);
        let coords = pca.transform(&log_cooc);
        let kept_dims: Vec<usize> = (0..pca.n_components())
            .filter(|d| !self.excluded_dims.contains(&(d + 1)))
            .collect();

        let mut columns: Vec<String> = axes::AXES
            .iter()
            .map(|(name, _, _)| format!("score_{name}"))
            .collect();
        columns.extend(kept_dims.iter().map(|d| format!("Dim{}", d + 1)));

        let mut table = FeatureFrame::new(columns);
        for (recipe_id, tokens) in &recipe_tokens {
            let mut cells = Vec::with_capacity(axes::AXES.len() + kept_dims.len());
            for axis in 0..axes::AXES.len() {
                let scores: Vec<f64> = tokens
                    .iter()
                    .map(|&t| f64::from(vocab_scores[t][axis]))
                    .collect();
                cells.push(fmt_cell(crate::util::stats::mean(&scores)));
            }
            for &dim in &kept_dims {
                let values: Vec<f64> = tokens
                    .iter()
                    .map(|&t| coords[(assignments[t], dim)])
                    .collect();
                cells.push(fmt_cell(crate::util::stats::mean(&values)));
            }
            table.push_row(*recipe_id, cells)?;
        }

        let mut summary = BTreeMap::new();
        summary.insert("vocab_size".to_string(), vocab.len() as f64);
        summary.insert("n_clusters".to_string(), n_clusters as f64);
        summary.insert("n_latent_dims".to_string(), kept_dims.len() as f64);

        Ok(AnalysisResult { table, summary })
    }
}

/// Average-linkage agglomerative clustering under cosine distance.
///
/// Merges the closest active pair until the minimum pairwise distance
/// reaches `threshold`, using the Lance-Williams update for average
/// linkage. Returns compact cluster ids in first-appearance order.
fn agglomerative_cosine(embeddings: &[Vec<f32>], threshold: f32) -> Vec<usize> {
    let n = embeddings.len();
    if n == 0 {
        return Vec::new();
    }

    let mut distance = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = f64::from(1.0 - cosine_similarity(&embeddings[i], &embeddings[j]));
            distance[i][j] = d;
            distance[j][i] = d;
        }
    }

    let mut active: Vec<bool> = vec![true; n];
    let mut size: Vec<f64> = vec![1.0; n];
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let threshold = f64::from(threshold);

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !active[j] {
                    continue;
                }
                if best.is_none_or(|(_, _, d)| distance[i][j] < d) {
                    best = Some((i, j, distance[i][j]));
                }
            }
        }
        let Some((i, j, d)) = best else { break };
        if d >= threshold {
            break;
        }

        // Merge j into i, average-linkage update against every survivor.
        for h in 0..n {
            if h == i || h == j || !active[h] {
                continue;
            }
            let updated =
                (size[i] * distance[i][h] + size[j] * distance[j][h]) / (size[i] + size[j]);
            distance[i][h] = updated;
            distance[h][i] = updated;
        }
        size[i] += size[j];
        let moved = std::mem::take(&mut members[j]);
        members[i].extend(moved);
        active[j] = false;
    }

    let mut assignments = vec![0usize; n];
    let mut next = 0usize;
    for (root, member_list) in members.iter().enumerate() {
        if !active[root] {
            continue;
        }
        for &m in member_list {
            assignments[m] = next;
        }
        next += 1;
    }
    // Renumber so cluster ids follow first appearance in the vocabulary.
    let mut remap: BTreeMap<usize, usize> = BTreeMap::new();
    assignments
        .iter()
        .map(|&c| {
            let next_id = remap.len();
            *remap.entry(c).or_insert(next_id)
        })
        .collect()
}

/// Pick a display label per cluster: the member used most often across
/// recipes, first-seen vocabulary order breaking ties.
fn label_clusters(
    vocab: &[String],
    recipe_tokens: &[(i64, Vec<usize>)],
    assignments: &[usize],
    n_clusters: usize,
) -> Vec<String> {
    let mut usage = vec![0usize; vocab.len()];
    for (_, tokens) in recipe_tokens {
        for &t in tokens {
            usage[t] += 1;
        }
    }

    let mut best: Vec<Option<usize>> = vec![None; n_clusters];
    for (token, &cluster) in assignments.iter().enumerate() {
        let replace = match best[cluster] {
            None => true,
            Some(current) => usage[token] > usage[current],
        };
        if replace {
            best[cluster] = Some(token);
        }
    }
    best.iter()
        .map(|token| token.map(|t| vocab[t].clone()).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    fn recipe(id: i64, ingredients: &str) -> Recipe {
        Recipe {
            id,
            name: Some(format!("recipe {id}")),
            minutes: None,
            n_steps: None,
            n_ingredients: None,
            nutrition: None,
            ingredients: Some(ingredients.to_string()),
            tags: None,
        }
    }

    fn analyser(excluded: Vec<usize>) -> IngredientsAnalyser {
        IngredientsAnalyser::new(Arc::new(HashEmbedder::default()), 0.5, 10, excluded)
    }

    #[test]
    fn near_identical_ingredients_share_a_cluster() {
        let embedder = HashEmbedder::default();
        let embeddings = embedder
            .encode(&[
                "fresh basil leaves".to_string(),
                "fresh basil leaf".to_string(),
                "soy sauce".to_string(),
            ])
            .expect("encode");

        let assignments = agglomerative_cosine(&embeddings, 0.5);
        assert_eq!(assignments[0], assignments[1]);
        assert_ne!(assignments[0], assignments[2]);
    }

    #[test]
    fn cluster_ids_are_compact_and_first_appearance_ordered() {
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.01],
        ];
        let assignments = agglomerative_cosine(&embeddings, 0.3);
        assert_eq!(assignments[0], 0);
        assert_eq!(assignments[1], 1);
        assert_eq!(assignments[2], 0);
    }

    #[test]
    fn axis_scores_are_populated_for_every_recipe() {
        let recipes = vec![
            recipe(1, "['granulated sugar', 'butter', 'flour']"),
            recipe(2, "['beef steak', 'salt', 'black pepper']"),
        ];
        let result = analyser(vec![1, 3]).analyze(&recipes, &[]).expect("analysis");

        for axis in ["score_sweet_savory", "score_vegetarian_meat"] {
            let scores = result.table.numeric_column(axis).expect("column");
            assert_eq!(scores.len(), 2);
            assert!(scores.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn excluded_dims_are_absent_from_the_table() {
        let recipes = vec![
            recipe(1, "['salt']"),
            recipe(2, "['water', 'flour']"),
            recipe(3, "['water', 'salt', 'flour']"),
        ];
        let result = analyser(vec![1, 3]).analyze(&recipes, &[]).expect("analysis");

        assert!(!result.table.has_column("Dim1"));
        assert!(!result.table.has_column("Dim3"));
        assert!(result.table.has_column("Dim2"));
    }

    #[test]
    fn empty_ingredient_list_yields_nan_not_error() {
        let recipes = vec![recipe(1, "[]"), recipe(2, "['salt']")];
        let result = analyser(vec![]).analyze(&recipes, &[]).expect("analysis");

        let scores = result
            .table
            .numeric_column("score_sweet_savory")
            .expect("column");
        assert!(scores[0].is_nan());
        assert!(scores[1].is_finite());
    }

    #[test]
    fn malformed_ingredient_literal_is_an_error() {
        let recipes = vec![recipe(1, "not a list")];
        let err = analyser(vec![]).analyze(&recipes, &[]).expect_err("malformed");
        assert!(matches!(err, AnalysisError::MalformedValue { .. }));
    }

    #[test]
    fn all_none_ingredients_is_a_missing_column() {
        let recipes = vec![Recipe {
            id: 1,
            name: None,
            minutes: None,
            n_steps: None,
            n_ingredients: None,
            nutrition: None,
            ingredients: None,
            tags: None,
        }];
        let err = analyser(vec![]).analyze(&recipes, &[]).expect_err("missing");
        assert!(err.to_string().contains("ingredients"));
    }
}
