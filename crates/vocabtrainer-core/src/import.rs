//! Bulk import of a word table into the store.
//!
//! Input is CSV with the header `word,level,ielts,gre`. Extra columns are
//! ignored. Embeddings are computed at import time and every new word starts
//! with a rating of 0.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedder;
use crate::error::ImportError;
use crate::model::{CefrLevel, ExamFlags};
use crate::store::{NewWord, WordStore};

/// Counts from one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Data rows read, header excluded.
    pub rows: usize,
    pub imported: usize,
    /// Rows repeating a word seen earlier in the same table.
    pub duplicate_rows: usize,
    /// Words with no embedding, which retrieval could never find.
    pub skipped_unknown: usize,
    /// Words already in the store; their ratings are left alone.
    pub already_present: usize,
}

#[derive(Debug, Deserialize)]
struct WordRow {
    word: String,
    level: String,
    #[serde(default)]
    ielts: String,
    #[serde(default)]
    gre: String,
}

/// Import a CSV word table from `path`.
pub fn import_csv(
    path: &Path,
    embedder: &Embedder,
    store: &mut WordStore,
) -> Result<ImportSummary, ImportError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    import_rows(reader, embedder, store)
}

/// Import a CSV word table from any reader.
pub fn import_reader<R: Read>(
    reader: R,
    embedder: &Embedder,
    store: &mut WordStore,
) -> Result<ImportSummary, ImportError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    import_rows(reader, embedder, store)
}

fn import_rows<R: Read>(
    mut reader: csv::Reader<R>,
    embedder: &Embedder,
    store: &mut WordStore,
) -> Result<ImportSummary, ImportError> {
    let headers = reader.headers()?.clone();
    let mut summary = ImportSummary::default();
    let mut seen = HashSet::new();
    let mut batch = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: WordRow = record.deserialize(Some(&headers))?;
        summary.rows += 1;

        let word = row.word.to_lowercase();
        if word.is_empty() {
            return Err(ImportError::InvalidRow {
                line,
                reason: "empty word".into(),
            });
        }
        let cefr_level: CefrLevel = row.level.parse().map_err(|reason| ImportError::InvalidRow {
            line,
            reason,
        })?;
        let in_exam = ExamFlags::new(
            parse_flag(&row.ielts, "ielts", line)?,
            parse_flag(&row.gre, "gre", line)?,
        );

        if !seen.insert(word.clone()) {
            summary.duplicate_rows += 1;
            continue;
        }
        if store.contains(&word)? {
            summary.already_present += 1;
            continue;
        }
        if !embedder.contains(&word) {
            tracing::debug!("no embedding for '{word}', skipping");
            summary.skipped_unknown += 1;
            continue;
        }

        batch.push(NewWord {
            embedding: embedder.encode(&word),
            word,
            cefr_level,
            in_exam,
        });
    }

    store.add_batch(&batch)?;
    summary.imported = batch.len();

    if summary.skipped_unknown > 0 {
        tracing::warn!(
            "{} words skipped: not in the embedding table",
            summary.skipped_unknown
        );
    }
    tracing::info!(
        "imported {} of {} rows ({} duplicates, {} already present)",
        summary.imported,
        summary.rows,
        summary.duplicate_rows,
        summary.already_present
    );
    Ok(summary)
}

fn parse_flag(value: &str, column: &str, line: u64) -> Result<bool, ImportError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        other => Err(ImportError::InvalidRow {
            line,
            reason: format!("column '{column}' must be 0/1/true/false, got '{other}'"),
        }),
    }
}
