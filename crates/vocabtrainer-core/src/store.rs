//! Persisted vocabulary store backed by SQLite.
//!
//! One row per word. Embeddings are stored as little-endian `f32` blobs and
//! ranked in process by cosine similarity; insertion order (`rowid`) breaks
//! ties. Rating updates are single in-place `UPDATE` statements, so a word is
//! never absent while its rating changes.

use std::cmp::Ordering;
use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::embedding::{cosine_similarity, is_sentinel};
use crate::error::StoreError;
use crate::model::{CefrLevel, Exam, ExamFlags, WordEntry};

type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS words (
    word TEXT PRIMARY KEY NOT NULL,
    embedding BLOB NOT NULL,
    cefr TEXT NOT NULL,
    in_ielts BOOLEAN NOT NULL,
    in_gre BOOLEAN NOT NULL,
    understanding_rating REAL NOT NULL DEFAULT 0
        CHECK (understanding_rating >= 0 AND understanding_rating <= 1)
)
"#;

const SELECT_COLUMNS: &str =
    "SELECT word, embedding, cefr, in_ielts, in_gre, understanding_rating FROM words";

/// A word about to be inserted.
#[derive(Debug, Clone)]
pub struct NewWord {
    pub word: String,
    pub embedding: Vec<f32>,
    pub cefr_level: CefrLevel,
    pub in_exam: ExamFlags,
}

/// Vocabulary store.
#[derive(Debug)]
pub struct WordStore {
    conn: Connection,
}

impl WordStore {
    /// Open (or create) a store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// A throwaway store that lives only as long as the value.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn })
    }

    /// Insert a new word with a zero understanding rating.
    pub fn add(
        &self,
        word: &str,
        embedding: &[f32],
        cefr_level: CefrLevel,
        in_exam: ExamFlags,
    ) -> Result<()> {
        let dim = self.dimension()?;
        insert(&self.conn, dim, word, embedding, cefr_level, in_exam)
    }

    /// Insert many words in one transaction; nothing is kept if any fails.
    pub fn add_batch(&mut self, words: &[NewWord]) -> Result<()> {
        let mut dim = self.dimension()?;
        let tx = self.conn.transaction()?;
        for w in words {
            insert(&tx, dim, &w.word, &w.embedding, w.cefr_level, w.in_exam)?;
            dim.get_or_insert(w.embedding.len());
        }
        tx.commit()?;
        Ok(())
    }

    /// Fetch a single entry.
    pub fn get(&self, word: &str) -> Result<Option<WordEntry>> {
        let sql = format!("{SELECT_COLUMNS} WHERE word = ?1");
        let entry = self
            .conn
            .query_row(&sql, [word], row_to_entry)
            .optional()?;
        Ok(entry)
    }

    /// Entries ranked by descending cosine similarity to `query`, at most `n`.
    pub fn query_by_similarity(&self, query: &[f32], n: usize) -> Result<Vec<WordEntry>> {
        if query.is_empty() {
            return Err(StoreError::InvalidQuery("query embedding is empty".into()));
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(StoreError::InvalidQuery(
                "query embedding has non-finite components".into(),
            ));
        }
        if is_sentinel(query) {
            return Err(StoreError::InvalidQuery(
                "query embedding is the zero vector".into(),
            ));
        }
        if let Some(dim) = self.dimension()? {
            if dim != query.len() {
                return Err(StoreError::InvalidQuery(format!(
                    "expected {dim} components, got {}",
                    query.len()
                )));
            }
        }

        // query_all is in rowid order and sort_by is stable, so equal scores
        // keep insertion order.
        let mut scored: Vec<(f32, WordEntry)> = self
            .query_all()?
            .into_iter()
            .filter_map(|entry| cosine_similarity(query, &entry.embedding).map(|s| (s, entry)))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(n);

        Ok(scored.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Entries flagged for `exam_name` ("IELTS" or "GRE").
    pub fn query_by_exam(&self, exam_name: &str) -> Result<Vec<WordEntry>> {
        let exam: Exam = exam_name.parse()?;
        let column = match exam {
            Exam::Ielts => "in_ielts",
            Exam::Gre => "in_gre",
        };
        let sql = format!("{SELECT_COLUMNS} WHERE {column} = 1 ORDER BY rowid");
        self.collect(&sql)
    }

    /// Every entry, in insertion order.
    pub fn query_all(&self) -> Result<Vec<WordEntry>> {
        self.collect(&format!("{SELECT_COLUMNS} ORDER BY rowid"))
    }

    /// Replace a word's rating. Embedding, level and exam flags are untouched.
    pub fn update_understanding_rating(&self, word: &str, new_rating: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&new_rating) {
            return Err(StoreError::OutOfRange {
                word: word.to_string(),
                rating: new_rating,
            });
        }
        let changed = self.conn.execute(
            "UPDATE words SET understanding_rating = ?1 WHERE word = ?2",
            params![new_rating, word],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(word.to_string()));
        }
        Ok(())
    }

    pub fn contains(&self, word: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM words WHERE word = ?1", [word], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Embedding dimension of the stored entries, if any exist.
    fn dimension(&self) -> Result<Option<usize>> {
        let bytes: Option<i64> = self
            .conn
            .query_row(
                "SELECT length(embedding) FROM words ORDER BY rowid LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| b as usize / 4))
    }

    fn collect(&self, sql: &str) -> Result<Vec<WordEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn insert(
    conn: &Connection,
    dim: Option<usize>,
    word: &str,
    embedding: &[f32],
    cefr_level: CefrLevel,
    in_exam: ExamFlags,
) -> Result<()> {
    validate_embedding(word, embedding, dim)?;

    let result = conn.execute(
        r#"
        INSERT INTO words (word, embedding, cefr, in_ielts, in_gre, understanding_rating)
        VALUES (?1, ?2, ?3, ?4, ?5, 0)
        "#,
        params![
            word,
            encode_embedding(embedding),
            cefr_level.as_str(),
            in_exam.ielts,
            in_exam.gre,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(StoreError::DuplicateKey(word.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

fn validate_embedding(word: &str, embedding: &[f32], dim: Option<usize>) -> Result<()> {
    let invalid = |reason: String| StoreError::InvalidEmbedding {
        word: word.to_string(),
        reason,
    };
    if embedding.is_empty() {
        return Err(invalid("embedding is empty".into()));
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(invalid("embedding has non-finite components".into()));
    }
    if is_sentinel(embedding) {
        return Err(invalid("embedding is the zero vector".into()));
    }
    match dim {
        Some(dim) if dim != embedding.len() => Err(invalid(format!(
            "expected {dim} components, got {}",
            embedding.len()
        ))),
        _ => Ok(()),
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<WordEntry> {
    let blob: Vec<u8> = row.get(1)?;
    let cefr: String = row.get(2)?;
    let cefr_level = cefr.parse::<CefrLevel>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;

    Ok(WordEntry {
        word: row.get(0)?,
        embedding: decode_embedding(&blob),
        cefr_level,
        in_exam: ExamFlags {
            ielts: row.get(3)?,
            gre: row.get(4)?,
        },
        understanding_rating: row.get(5)?,
    })
}
