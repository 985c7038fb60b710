//! Candidate retrieval: intent keywords → filtered, deduplicated candidates.
//!
//! Each keyword is embedded and searched on its own rather than folded into
//! one averaged query vector, so a single dominant keyword cannot skew the
//! whole result. Per-keyword hits pass the exam gate, are merged with
//! first-occurrence-wins deduplication, and words at or above the mastery
//! threshold are cut.

use serde::{Deserialize, Serialize};

use crate::embedding::{is_sentinel, Embedder};
use crate::error::StoreError;
use crate::model::{CandidateSet, Exam, Intent, WordEntry};
use crate::store::WordStore;

/// Nearest neighbours fetched per keyword.
pub const DEFAULT_PER_KEYWORD: usize = 10;
/// Words rated at or above this are considered learned.
pub const DEFAULT_MASTERY_THRESHOLD: f64 = 0.5;

/// Retrieval tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    pub per_keyword: usize,
    pub mastery_threshold: f64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            per_keyword: DEFAULT_PER_KEYWORD,
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
        }
    }
}

/// Outcome of a retrieval. Running out of words is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Candidates(CandidateSet),
    /// Nothing left to practise for this goal.
    AllWordsMastered,
}

impl Retrieval {
    pub fn candidates(&self) -> Option<&CandidateSet> {
        match self {
            Retrieval::Candidates(set) => Some(set),
            Retrieval::AllWordsMastered => None,
        }
    }

    pub fn is_all_mastered(&self) -> bool {
        matches!(self, Retrieval::AllWordsMastered)
    }
}

/// Maps an [`Intent`] to a [`CandidateSet`].
#[derive(Debug, Clone)]
pub struct CandidateRetriever {
    embedder: Embedder,
    config: RetrieverConfig,
}

impl CandidateRetriever {
    pub fn new(embedder: Embedder, config: RetrieverConfig) -> Self {
        Self { embedder, config }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn retrieve(&self, store: &WordStore, intent: &Intent) -> Result<Retrieval, StoreError> {
        let gate = intent.exam_gate();
        if gate.is_none() {
            if let Some(name) = &intent.exam {
                tracing::info!("exam '{name}' is not tracked, retrieving without exam filter");
            }
        }

        let mut merged = CandidateSet::new();
        for keyword in &intent.keywords {
            let query = self.embedder.encode(keyword);
            if is_sentinel(&query) {
                tracing::debug!("keyword '{keyword}' has no embedding, skipping");
                continue;
            }

            let hits = store.query_by_similarity(&query, self.config.per_keyword)?;
            let before = merged.len();
            for entry in hits.iter().filter(|e| passes_exam_gate(e, gate)) {
                merged.push(entry.candidate());
            }
            tracing::debug!(
                "keyword '{keyword}': {} hits, {} new candidates",
                hits.len(),
                merged.len() - before
            );
        }

        let threshold = self.config.mastery_threshold;
        merged.retain(|c| c.understanding_rating < threshold);

        if merged.is_empty() {
            tracing::info!("no unmastered candidates for keywords {:?}", intent.keywords);
            return Ok(Retrieval::AllWordsMastered);
        }
        Ok(Retrieval::Candidates(merged))
    }
}

fn passes_exam_gate(entry: &WordEntry, gate: Option<Exam>) -> bool {
    gate.map_or(true, |exam| entry.in_exam.contains(exam))
}
