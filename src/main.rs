#![deny(warnings, clippy::all, clippy::pedantic)]

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use typology_worker::{
    config::Config,
    embedding::{Embedder, HashEmbedder},
    observability,
    pipeline::{PipelineSettings, TypologyPipeline},
    store::repository::CsvRepository,
};

fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(|s| s.as_str())
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(
                thread = thread_name,
                message, "panic occurred without location information"
            );
        }
    }));

    observability::init().context("failed to initialize tracing")?;
    let config = Config::from_env().context("failed to load configuration")?;

    let repository = CsvRepository::new(
        config.recipes_csv().clone(),
        config.interactions_csv().clone(),
    );
    let embedder = build_embedder(&config);

    let pipeline = TypologyPipeline::new(PipelineSettings::from(&config), embedder);
    let report = pipeline.run(&repository)?;

    info!(
        recipes = report.n_recipes,
        interactions = report.n_interactions,
        clustered = report.n_clustered,
        dropped = report.dropped_rows,
        tables = report.tables.len(),
        "typology run finished"
    );

    Ok(())
}

#[cfg(feature = "with-bert")]
fn build_embedder(config: &Config) -> Arc<dyn Embedder> {
    use tracing::warn;

    match typology_worker::embedding::BertEmbedder::new() {
        Ok(bert) => Arc::new(bert),
        Err(error) => {
            warn!(%error, "sentence-transformer unavailable, using hashing embedder");
            Arc::new(HashEmbedder::new(config.embedding_dim()))
        }
    }
}

#[cfg(not(feature = "with-bert"))]
fn build_embedder(config: &Config) -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(config.embedding_dim()))
}
