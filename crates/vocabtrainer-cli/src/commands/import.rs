//! The `vocabtrainer import` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use vocabtrainer_core::embedding::{Embedder, EmbeddingTable};
use vocabtrainer_core::import::import_csv;
use vocabtrainer_core::store::WordStore;

pub fn execute(
    data: PathBuf,
    embeddings: Option<PathBuf>,
    database: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = vocabtrainer_providers::config::load_config_from(config_path.as_deref())?;
    let embeddings_path = embeddings.unwrap_or(config.embeddings_path);
    let database_path = database.unwrap_or(config.database_path);

    if !data.exists() {
        anyhow::bail!("word table not found: {}", data.display());
    }

    let table = EmbeddingTable::load(&embeddings_path)
        .with_context(|| format!("failed to load embeddings: {}", embeddings_path.display()))?;
    let embedder = Embedder::new(Arc::new(table));
    let mut store = WordStore::open(&database_path)
        .with_context(|| format!("failed to open store: {}", database_path.display()))?;

    let summary = import_csv(&data, &embedder, &mut store)
        .with_context(|| format!("failed to import {}", data.display()))?;

    println!(
        "Imported {} of {} rows into {}",
        summary.imported,
        summary.rows,
        database_path.display()
    );
    if summary.duplicate_rows > 0 {
        println!("  {} duplicate rows ignored", summary.duplicate_rows);
    }
    if summary.already_present > 0 {
        println!("  {} words already in the store", summary.already_present);
    }
    if summary.skipped_unknown > 0 {
        println!("  {} words have no embedding, skipped", summary.skipped_unknown);
    }
    println!("Store now holds {} words", store.len()?);

    Ok(())
}
