//! Error types for the vocabtrainer core.
//!
//! Store failures, LLM boundary validation failures and embedding-table
//! loading failures are kept apart so callers can match on them instead of
//! inspecting message strings.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the word store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A word with this key is already stored.
    #[error("word already exists: {0}")]
    DuplicateKey(String),

    /// The embedding supplied for a new word is unusable.
    #[error("invalid embedding for '{word}': {reason}")]
    InvalidEmbedding { word: String, reason: String },

    /// The query vector is unusable.
    #[error("invalid query embedding: {0}")]
    InvalidQuery(String),

    /// The exam name is not one the store tracks.
    #[error("unknown exam: {0}")]
    UnknownExam(String),

    /// No word with this key is stored.
    #[error("word not found: {0}")]
    NotFound(String),

    /// A rating outside [0, 1] was rejected; the stored value is unchanged.
    #[error("understanding rating {rating} for '{word}' is outside [0, 1]")]
    OutOfRange { word: String, rating: f64 },

    /// The underlying SQLite database failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store's directory could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An external generative collaborator returned data that fails validation.
#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    /// The response did not contain parseable JSON.
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    /// The top-level JSON value was not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),

    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(String),

    /// A field holds the wrong JSON type.
    #[error("field `{field}` should be {expected}")]
    WrongType { field: String, expected: String },

    /// A field the contract does not define was present.
    #[error("unexpected field `{0}`")]
    UnexpectedField(String),

    /// A field parsed but its value breaks the contract.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    /// A referenced word is not part of the known vocabulary.
    #[error("unknown word: {0}")]
    UnknownWord(String),

    /// Nothing usable was left after validation.
    #[error("empty response: {0}")]
    Empty(String),
}

impl FormatError {
    pub(crate) fn wrong_type(field: impl Into<String>, expected: impl Into<String>) -> Self {
        FormatError::WrongType {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FormatError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading an embedding table.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to read embeddings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("embedding table is empty")]
    Empty,
}

/// Errors raised while importing a word table.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read word table: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by the quiz pipeline to whoever orchestrates a session.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Upstream returned malformed data. Never retried inside the core.
    #[error("upstream format error from {stage}: {source}")]
    UpstreamFormat {
        stage: &'static str,
        #[source]
        source: FormatError,
    },

    /// The LLM transport failed (after any retries the provider applies).
    #[error("provider call failed during {stage}: {error:#}")]
    Provider {
        stage: &'static str,
        error: anyhow::Error,
    },
}

impl PipelineError {
    pub fn format(stage: &'static str, source: FormatError) -> Self {
        PipelineError::UpstreamFormat { stage, source }
    }

    /// Returns `true` for malformed-upstream-data failures.
    pub fn is_upstream_format(&self) -> bool {
        matches!(self, PipelineError::UpstreamFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_messages() {
        let err = StoreError::OutOfRange {
            word: "apple".into(),
            rating: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "understanding rating 1.5 for 'apple' is outside [0, 1]"
        );
        assert_eq!(
            StoreError::UnknownExam("TOEFL".into()).to_string(),
            "unknown exam: TOEFL"
        );
    }

    #[test]
    fn pipeline_error_classification() {
        let err = PipelineError::format("goal interpreter", FormatError::MissingField("exam".into()));
        assert!(err.is_upstream_format());
        assert!(err.to_string().contains("missing field `exam`"));

        let err = PipelineError::Provider {
            stage: "quiz builder",
            error: anyhow::anyhow!("network down"),
        };
        assert!(!err.is_upstream_format());
    }
}
