//! Offline heuristic for judging a selected word list against an intent.
//!
//! `vocabtrainer evaluate` uses it to compare the retrieval pipeline against
//! a single-call baseline selector. Not used on the quiz path.

use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::StoreError;
use crate::model::{Intent, WordEntry};
use crate::store::WordStore;

/// Weights for similarity, CEFR balance, exam hit rate and memory.
pub const QUALITY_WEIGHTS: [f64; 4] = [1.0, 0.5, 2.0, 1.0];

/// Component scores for one selection, each in roughly [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionQuality {
    /// Fraction of the selected words the store knows.
    pub hallucination_scalar: f64,
    /// Mean keyword similarity of the known words.
    pub similarity: f64,
    /// 1.0 when the mean difficulty sits at the middle of the CEFR scale.
    pub cefr_balance: f64,
    /// Fraction of known words tagged for the intent's exam (1.0 without one).
    pub exam_hit_rate: f64,
    /// One minus the mean understanding rating.
    pub memory: f64,
    /// Weighted mean of the four components, times the hallucination scalar.
    pub overall: f64,
}

pub fn evaluate_selection(
    words: &[String],
    intent: &Intent,
    store: &WordStore,
    embedder: &Embedder,
) -> Result<SelectionQuality, StoreError> {
    let mut known: Vec<WordEntry> = Vec::with_capacity(words.len());
    for word in words {
        if let Some(entry) = store.get(word)? {
            known.push(entry);
        }
    }
    if known.is_empty() {
        return Ok(SelectionQuality {
            hallucination_scalar: 0.0,
            similarity: 0.0,
            cefr_balance: 0.0,
            exam_hit_rate: 0.0,
            memory: 0.0,
            overall: 0.0,
        });
    }
    let hallucination_scalar = known.len() as f64 / words.len() as f64;

    let keyword_vectors: Vec<Vec<f32>> = intent.keywords.iter().map(|k| embedder.encode(k)).collect();
    let similarity = mean(known.iter().map(|entry| {
        mean(
            keyword_vectors
                .iter()
                .map(|k| cosine_similarity(&entry.embedding, k).unwrap_or(0.0) as f64),
        )
    }));

    let difficulty = mean(known.iter().map(|e| e.cefr_level.difficulty()));
    let cefr_balance = (0.5 - (difficulty - 0.5).abs()) * 2.0;

    let exam_hit_rate = match intent.exam_gate() {
        Some(exam) => mean(
            known
                .iter()
                .map(|e| if e.in_exam.contains(exam) { 1.0 } else { 0.0 }),
        ),
        None => 1.0,
    };

    let memory = 1.0 - mean(known.iter().map(|e| e.understanding_rating));

    let components = [similarity, cefr_balance, exam_hit_rate, memory];
    let weighted: f64 = components
        .iter()
        .zip(QUALITY_WEIGHTS)
        .map(|(score, weight)| score * weight)
        .sum();
    let overall = weighted / QUALITY_WEIGHTS.iter().sum::<f64>() * hallucination_scalar;

    Ok(SelectionQuality {
        hallucination_scalar,
        similarity,
        cefr_balance,
        exam_hit_rate,
        memory,
        overall,
    })
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
