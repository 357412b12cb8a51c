//! End-to-end pipeline runs over small CSV fixtures on disk.

use std::path::Path;
use std::sync::Arc;

use typology_worker::embedding::HashEmbedder;
use typology_worker::pipeline::persist::{CLUSTERING_FILE, MERGED_FILE};
use typology_worker::pipeline::{PipelineSettings, TypologyPipeline};
use typology_worker::store::repository::CsvRepository;

const RECIPES_CSV: &str = "\
id,name,minutes,n_steps,n_ingredients,nutrition,ingredients
1,plain bread,60,5,2,\"[250.0, 2.0, 1.0, 5.0, 9.0, 0.5, 48.0]\",\"['water', 'flour']\"
2,salted water,5,1,2,\"[0.0, 0.0, 0.0, 80.0, 0.0, 0.0, 0.0]\",\"['water', 'salt']\"
3,flatbread,30,4,3,\"[220.0, 3.0, 1.0, 40.0, 8.0, 1.0, 42.0]\",\"['water', 'salt', 'flour']\"
4,salt crust,90,9,2,\"[180.0, 1.0, 0.5, 95.0, 6.0, 0.2, 35.0]\",\"['salt', 'flour']\"
5,flour paste,10,2,2,\"[120.0, 1.0, 0.5, 2.0, 4.0, 0.1, 25.0]\",\"['flour', 'water']\"
6,brine,2,1,2,\"[0.0, 0.0, 0.0, 120.0, 0.0, 0.0, 0.0]\",\"['salt', 'water']\"
";

const INTERACTIONS_CSV: &str = "\
user_id,recipe_id,date,rating
11,1,2020-01-05,5
12,1,2020-01-20,4
13,1,2020-02-02,5
14,2,2020-06-15,3
15,2,2020-07-01,0
16,3,2020-07-20,4
17,3,2020-08-01,5
18,4,2020-11-25,2
";

fn settings(root: &Path) -> PipelineSettings {
    PipelineSettings {
        features_dir: root.join("preprocessed"),
        clustering_dir: root.join("clustering"),
        kmeans_clusters: 2,
        kmeans_pcs: 12,
        kmeans_max_iterations: 300,
        random_seed: 42,
        seasonality_smoothing: 5.0,
        rating_mu_percentile: 0.5,
        ingredient_cluster_threshold: 0.5,
        cooc_pca_components: 10,
        cooc_excluded_dims: vec![1, 3],
        parallel_analysers: true,
    }
}

fn write_fixtures(root: &Path) -> CsvRepository {
    let recipes_path = root.join("raw_recipes.csv");
    let interactions_path = root.join("raw_interactions.csv");
    std::fs::write(&recipes_path, RECIPES_CSV).expect("recipes fixture");
    std::fs::write(&interactions_path, INTERACTIONS_CSV).expect("interactions fixture");
    CsvRepository::new(recipes_path, interactions_path)
}

fn run(root: &Path) -> typology_worker::pipeline::PipelineReport {
    let repository = write_fixtures(root);
    let pipeline = TypologyPipeline::new(settings(root), Arc::new(HashEmbedder::default()));
    pipeline.run(&repository).expect("pipeline run")
}

#[test]
fn writes_every_artifact_and_clusters_all_recipes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = run(dir.path());

    assert_eq!(report.n_recipes, 6);
    assert_eq!(report.n_interactions, 8);
    assert_eq!(report.n_clustered, 6);
    assert_eq!(report.dropped_rows, 0);

    for table in ["nutrition", "seasonality", "rating", "complexity", "ingredients"] {
        let features = dir.path().join("preprocessed");
        assert!(features.join(format!("{table}_table.csv")).exists());
        assert!(features.join(format!("{table}_summary.csv")).exists());
    }

    let clustering = dir.path().join("clustering");
    assert!(clustering.join(MERGED_FILE).exists());

    let output =
        std::fs::read_to_string(clustering.join(CLUSTERING_FILE)).expect("clustering file");
    let mut lines = output.lines();
    assert_eq!(lines.next(), Some("id,name,cluster,pc_1,pc_2"));
    assert_eq!(lines.count(), 6);
    assert!(output.contains("plain bread"));
}

#[test]
fn merged_table_keeps_only_unexcluded_latent_dims() {
    let dir = tempfile::tempdir().expect("tempdir");
    run(dir.path());

    // Three distinct ingredient tokens, so the co-occurrence PCA yields
    // three latent dimensions and the exclusion leaves exactly Dim2.
    let merged = std::fs::read_to_string(dir.path().join("clustering").join(MERGED_FILE))
        .expect("merged file");
    let header = merged.lines().next().expect("header");
    assert!(header.contains("Dim2"));
    assert!(!header.contains("Dim1"));
    assert!(!header.contains("Dim3"));
    for score in [
        "score_sweet_savory",
        "score_spicy_mild",
        "score_lowcal_rich",
        "score_vegetarian_meat",
        "score_solid_liquid",
        "score_raw_processed",
        "score_western_exotic",
    ] {
        assert!(header.contains(score), "missing {score}");
    }
}

#[test]
fn same_seed_produces_byte_identical_clustering_output() {
    let dir_a = tempfile::tempdir().expect("tempdir");
    let dir_b = tempfile::tempdir().expect("tempdir");
    run(dir_a.path());
    run(dir_b.path());

    let output_a =
        std::fs::read_to_string(dir_a.path().join("clustering").join(CLUSTERING_FILE))
            .expect("first output");
    let output_b =
        std::fs::read_to_string(dir_b.path().join("clustering").join(CLUSTERING_FILE))
            .expect("second output");
    assert_eq!(output_a, output_b);
}

#[test]
fn interactions_without_a_date_column_fail_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recipes_path = dir.path().join("raw_recipes.csv");
    let interactions_path = dir.path().join("raw_interactions.csv");
    std::fs::write(&recipes_path, RECIPES_CSV).expect("recipes fixture");
    std::fs::write(&interactions_path, "user_id,recipe_id,rating\n11,1,5\n")
        .expect("interactions fixture");

    let repository = CsvRepository::new(recipes_path, interactions_path);
    let pipeline = TypologyPipeline::new(
        settings(dir.path()),
        Arc::new(HashEmbedder::default()),
    );

    let err = pipeline.run(&repository).expect_err("missing date column");
    let chain = format!("{err:#}");
    assert!(chain.contains("date"), "unexpected error: {chain}");
}
