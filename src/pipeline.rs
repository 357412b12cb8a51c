//! Pipeline orchestration: fan out the five analysers, persist their
//! tables, merge and validate, then scale, project, and cluster.

pub mod clustering;
pub mod merge;
pub mod persist;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;

use crate::analysis::{AnalysisResult, Analyser};
use crate::analysis::complexity::ComplexityAnalyser;
use crate::analysis::ingredients::IngredientsAnalyser;
use crate::analysis::nutrition::NutritionAnalyser;
use crate::analysis::rating::RatingAnalyser;
use crate::analysis::seasonality::SeasonalityAnalyser;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::store::repository::RecipeRepository;

/// Everything the pipeline needs, detached from the env-backed [`Config`]
/// so tests can construct it directly.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub features_dir: PathBuf,
    pub clustering_dir: PathBuf,
    pub kmeans_clusters: usize,
    pub kmeans_pcs: usize,
    pub kmeans_max_iterations: usize,
    pub random_seed: u64,
    pub seasonality_smoothing: f64,
    pub rating_mu_percentile: f64,
    pub ingredient_cluster_threshold: f32,
    pub cooc_pca_components: usize,
    pub cooc_excluded_dims: Vec<usize>,
    pub parallel_analysers: bool,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            features_dir: config.features_dir().to_path_buf(),
            clustering_dir: config.clustering_dir().to_path_buf(),
            kmeans_clusters: config.kmeans_clusters(),
            kmeans_pcs: config.kmeans_pcs(),
            kmeans_max_iterations: config.kmeans_max_iterations(),
            random_seed: config.random_seed(),
            seasonality_smoothing: config.seasonality_smoothing(),
            rating_mu_percentile: config.rating_mu_percentile(),
            ingredient_cluster_threshold: config.ingredient_cluster_threshold(),
            cooc_pca_components: config.cooc_pca_components(),
            cooc_excluded_dims: config.cooc_excluded_dims().to_vec(),
            parallel_analysers: config.parallel_analysers(),
        }
    }
}

/// Outcome counters for one full run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub n_recipes: usize,
    pub n_interactions: usize,
    pub n_clustered: usize,
    pub dropped_rows: usize,
    pub tables: Vec<String>,
}

/// The full typology pipeline: analysers, merge, and clustering.
pub struct TypologyPipeline {
    settings: PipelineSettings,
    analysers: Vec<Arc<dyn Analyser>>,
}

impl TypologyPipeline {
    #[must_use]
    pub fn new(settings: PipelineSettings, embedder: Arc<dyn Embedder>) -> Self {
        let analysers: Vec<Arc<dyn Analyser>> = vec![
            Arc::new(NutritionAnalyser::new()),
            Arc::new(SeasonalityAnalyser::new(settings.seasonality_smoothing)),
            Arc::new(RatingAnalyser::new(settings.rating_mu_percentile)),
            Arc::new(ComplexityAnalyser::new()),
            Arc::new(IngredientsAnalyser::new(
                embedder,
                settings.ingredient_cluster_threshold,
                settings.cooc_pca_components,
                settings.cooc_excluded_dims.clone(),
            )),
        ];
        Self {
            settings,
            analysers,
        }
    }

    /// Run the whole pipeline end to end and write every artifact.
    pub fn run(&self, repository: &dyn RecipeRepository) -> Result<PipelineReport> {
        let recipes = repository.load_recipes().context("loading recipes")?;
        let interactions = repository
            .load_interactions()
            .context("loading interactions")?;

        std::fs::create_dir_all(&self.settings.features_dir)
            .with_context(|| format!("creating {}", self.settings.features_dir.display()))?;
        std::fs::create_dir_all(&self.settings.clustering_dir)
            .with_context(|| format!("creating {}", self.settings.clustering_dir.display()))?;

        let results = self.run_analysers(&recipes, &interactions)?;
        let mut tables = Vec::with_capacity(results.len());
        for (name, result) in &results {
            persist::write_analysis(&self.settings.features_dir, name, result)
                .with_context(|| format!("persisting {name} tables"))?;
            info!(
                analyser = name,
                rows = result.table.len(),
                columns = result.table.columns().len(),
                "analyser finished"
            );
            tables.push((*name).to_string());
        }

        let merged =
            merge::load_and_merge(&self.settings.features_dir).context("merging feature tables")?;
        persist::write_merged(&self.settings.clustering_dir, &merged)
            .context("persisting merged features")?;

        let output = clustering::cluster(&merged, &self.settings).context("clustering")?;
        persist::write_clustering(&self.settings.clustering_dir, &output.rows)
            .context("persisting clustering output")?;

        info!(
            recipes = recipes.len(),
            clustered = output.rows.len(),
            dropped = output.dropped_rows,
            "pipeline complete"
        );

        Ok(PipelineReport {
            n_recipes: recipes.len(),
            n_interactions: interactions.len(),
            n_clustered: output.rows.len(),
            dropped_rows: output.dropped_rows,
            tables,
        })
    }

    fn run_analysers(
        &self,
        recipes: &[crate::schema::records::Recipe],
        interactions: &[crate::schema::records::Interaction],
    ) -> Result<Vec<(&'static str, AnalysisResult)>> {
        if self.settings.parallel_analysers {
            let workers = num_cpus::get().min(self.analysers.len().max(1));
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .context("building analyser thread pool")?;
            pool.install(|| {
                self.analysers
                    .par_iter()
                    .map(|analyser| {
                        let result = analyser
                            .analyze(recipes, interactions)
                            .with_context(|| format!("analyser {}", analyser.name()))?;
                        Ok((analyser.name(), result))
                    })
                    .collect()
            })
        } else {
            self.analysers
                .iter()
                .map(|analyser| {
                    let result = analyser
                        .analyze(recipes, interactions)
                        .with_context(|| format!("analyser {}", analyser.name()))?;
                    Ok((analyser.name(), result))
                })
                .collect()
        }
    }
}
