use std::{env, path::PathBuf};

use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    recipes_csv: PathBuf,
    interactions_csv: PathBuf,
    features_dir: PathBuf,
    clustering_dir: PathBuf,
    kmeans_clusters: usize,
    kmeans_pcs: usize,
    kmeans_max_iterations: usize,
    random_seed: u64,
    seasonality_smoothing: f64,
    rating_mu_percentile: f64,
    ingredient_cluster_threshold: f32,
    cooc_pca_components: usize,
    cooc_excluded_dims: Vec<usize>,
    parallel_analysers: bool,
    embedding_dim: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Read the worker configuration from environment variables.
    ///
    /// The two raw extract paths are required; everything else has a
    /// default matching the reference run.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `TYPOLOGY_RECIPES_CSV` or
    /// `TYPOLOGY_INTERACTIONS_CSV` is unset, or when a value fails to
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let recipes_csv = PathBuf::from(env_var("TYPOLOGY_RECIPES_CSV")?);
        let interactions_csv = PathBuf::from(env_var("TYPOLOGY_INTERACTIONS_CSV")?);
        let features_dir = parse_path("TYPOLOGY_FEATURES_DIR", "data/preprocessed");
        let clustering_dir = parse_path("TYPOLOGY_CLUSTERING_DIR", "data/clustering");

        let kmeans_clusters = parse_usize("TYPOLOGY_KMEANS_CLUSTERS", 5)?;
        let kmeans_pcs = parse_usize("TYPOLOGY_KMEANS_PCS", 12)?;
        let kmeans_max_iterations = parse_usize("TYPOLOGY_KMEANS_MAX_ITERATIONS", 300)?;
        let random_seed = parse_u64("TYPOLOGY_RANDOM_SEED", 42)?;

        let seasonality_smoothing = parse_f64("TYPOLOGY_SEASONALITY_SMOOTHING", 5.0)?;
        let rating_mu_percentile = parse_unit_f64("TYPOLOGY_RATING_MU_PERCENTILE", 0.5)?;

        let ingredient_cluster_threshold =
            parse_f64("TYPOLOGY_INGREDIENT_CLUSTER_THRESHOLD", 0.5)? as f32;
        let cooc_pca_components = parse_usize("TYPOLOGY_COOC_PCA_COMPONENTS", 10)?;
        let cooc_excluded_dims = parse_dim_list("TYPOLOGY_COOC_EXCLUDED_DIMS", "1,3")?;

        let parallel_analysers = parse_bool("TYPOLOGY_PARALLEL_ANALYSERS", true)?;
        let embedding_dim = parse_usize("TYPOLOGY_EMBEDDING_DIM", 256)?;

        Ok(Self {
            recipes_csv,
            interactions_csv,
            features_dir,
            clustering_dir,
            kmeans_clusters,
            kmeans_pcs,
            kmeans_max_iterations,
            random_seed,
            seasonality_smoothing,
            rating_mu_percentile,
            ingredient_cluster_threshold,
            cooc_pca_components,
            cooc_excluded_dims,
            parallel_analysers,
            embedding_dim,
        })
    }

    #[must_use]
    pub fn recipes_csv(&self) -> &PathBuf {
        &self.recipes_csv
    }

    #[must_use]
    pub fn interactions_csv(&self) -> &PathBuf {
        &self.interactions_csv
    }

    #[must_use]
    pub fn features_dir(&self) -> &PathBuf {
        &self.features_dir
    }

    #[must_use]
    pub fn clustering_dir(&self) -> &PathBuf {
        &self.clustering_dir
    }

    #[must_use]
    pub fn kmeans_clusters(&self) -> usize {
        self.kmeans_clusters
    }

    #[must_use]
    pub fn kmeans_pcs(&self) -> usize {
        self.kmeans_pcs
    }

    #[must_use]
    pub fn kmeans_max_iterations(&self) -> usize {
        self.kmeans_max_iterations
    }

    #[must_use]
    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }

    #[must_use]
    pub fn seasonality_smoothing(&self) -> f64 {
        self.seasonality_smoothing
    }

    #[must_use]
    pub fn rating_mu_percentile(&self) -> f64 {
        self.rating_mu_percentile
    }

    #[must_use]
    pub fn ingredient_cluster_threshold(&self) -> f32 {
        self.ingredient_cluster_threshold
    }

    #[must_use]
    pub fn cooc_pca_components(&self) -> usize {
        self.cooc_pca_components
    }

    #[must_use]
    pub fn cooc_excluded_dims(&self) -> &[usize] {
        &self.cooc_excluded_dims
    }

    #[must_use]
    pub fn parallel_analysers(&self) -> bool {
        self.parallel_analysers
    }

    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_path(name: &'static str, default: &str) -> PathBuf {
    PathBuf::from(env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_unit_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let parsed = parse_f64(name, default)?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0 and 1"),
        });
    }
    Ok(parsed)
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}

/// Comma-separated 1-based dimension numbers, e.g. `"1,3"`. An empty value
/// excludes nothing.
fn parse_dim_list(name: &'static str, default: &str) -> Result<Vec<usize>, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let mut dims = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let dim = part.parse::<usize>().map_err(|error| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(error),
        })?;
        if dim == 0 {
            return Err(ConfigError::Invalid {
                name,
                source: anyhow::anyhow!("dimension numbers are 1-based"),
            });
        }
        dims.push(dim);
    }
    Ok(dims)
}
