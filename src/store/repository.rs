//! Input data access for the raw recipe and interaction extracts.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::schema::records::{Interaction, Recipe};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to parse row {row} of {path}: {source}")]
    Parse {
        path: String,
        row: usize,
        #[source]
        source: csv::Error,
    },
}

/// Source of raw recipes and interactions, behind a trait so tests can feed
/// in-memory fixtures without touching the filesystem.
pub trait RecipeRepository: Send + Sync {
    fn load_recipes(&self) -> Result<Vec<Recipe>, RepositoryError>;
    fn load_interactions(&self) -> Result<Vec<Interaction>, RepositoryError>;
}

/// CSV-file backed repository over the two raw extracts.
#[derive(Debug, Clone)]
pub struct CsvRepository {
    recipes_path: PathBuf,
    interactions_path: PathBuf,
}

impl CsvRepository {
    #[must_use]
    pub fn new(recipes_path: PathBuf, interactions_path: PathBuf) -> Self {
        Self {
            recipes_path,
            interactions_path,
        }
    }

    fn read_all<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, RepositoryError> {
        let display = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|source| RepositoryError::Open {
                path: display.clone(),
                source,
            })?;

        let mut rows = Vec::new();
        for (row, record) in reader.deserialize::<T>().enumerate() {
            let record = record.map_err(|source| RepositoryError::Parse {
                path: display.clone(),
                // Header is line 1, first data row is line 2.
                row: row + 2,
                source,
            })?;
            rows.push(record);
        }
        Ok(rows)
    }
}

impl RecipeRepository for CsvRepository {
    fn load_recipes(&self) -> Result<Vec<Recipe>, RepositoryError> {
        let recipes = Self::read_all(&self.recipes_path)?;
        info!(
            path = %self.recipes_path.display(),
            count = recipes.len(),
            "loaded recipes"
        );
        Ok(recipes)
    }

    fn load_interactions(&self) -> Result<Vec<Interaction>, RepositoryError> {
        let interactions = Self::read_all(&self.interactions_path)?;
        info!(
            path = %self.interactions_path.display(),
            count = interactions.len(),
            "loaded interactions"
        );
        Ok(interactions)
    }
}

/// Fixed in-memory repository for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    pub recipes: Vec<Recipe>,
    pub interactions: Vec<Interaction>,
}

impl RecipeRepository for InMemoryRepository {
    fn load_recipes(&self) -> Result<Vec<Recipe>, RepositoryError> {
        Ok(self.recipes.clone())
    }

    fn load_interactions(&self) -> Result<Vec<Interaction>, RepositoryError> {
        Ok(self.interactions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_recipes_with_optional_columns_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipes.csv");
        std::fs::write(&path, "id,name,minutes\n1,lemonade,10\n2,stew,\n").expect("fixture");

        let repo = CsvRepository::new(path, dir.path().join("unused.csv"));
        let recipes = repo.load_recipes().expect("load");

        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].name.as_deref(), Some("lemonade"));
        assert_eq!(recipes[1].minutes, None);
        assert!(recipes[0].ingredients.is_none());
    }

    #[test]
    fn loads_interactions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("interactions.csv");
        std::fs::write(
            &path,
            "user_id,recipe_id,date,rating\n7,1,2019-06-01,5\n8,1,2019-06-02,0\n",
        )
        .expect("fixture");

        let repo = CsvRepository::new(dir.path().join("unused.csv"), path);
        let interactions = repo.load_interactions().expect("load");

        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[0].recipe_id, Some(1));
        assert_eq!(interactions[1].rating, Some(0.0));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let repo = CsvRepository::new(PathBuf::from("/nonexistent/r.csv"), PathBuf::new());
        let err = repo.load_recipes().expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/r.csv"));
    }
}
