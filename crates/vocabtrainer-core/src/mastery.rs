//! Applying scorer output to the word store.
//!
//! Each (word, rating) pair is written independently. A rejected write
//! (unknown word, rating outside [0, 1]) only zeroes that word's feedback;
//! the remaining words from the same item are still persisted.

use serde::{Deserialize, Serialize};

use crate::boundary::scoring::WordScores;
use crate::boundary::quiz::QuizItem;
use crate::error::StoreError;
use crate::store::WordStore;

/// What happened to one word's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WordOutcome {
    Updated { word: String, rating: f64 },
    Rejected { word: String, reason: String },
}

impl WordOutcome {
    pub fn word(&self) -> &str {
        match self {
            WordOutcome::Updated { word, .. } | WordOutcome::Rejected { word, .. } => word,
        }
    }
}

/// Per-word results for one answered item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasteryReport {
    pub outcomes: Vec<WordOutcome>,
}

impl MasteryReport {
    /// Effective score for `word`: the persisted rating, or 0.0 if the update
    /// was rejected or never attempted.
    pub fn feedback(&self, word: &str) -> f64 {
        self.outcomes
            .iter()
            .find_map(|o| match o {
                WordOutcome::Updated { word: w, rating } if w == word => Some(*rating),
                _ => None,
            })
            .unwrap_or(0.0)
    }

    /// Mean effective score over the words `item` tests.
    pub fn item_score(&self, item: &QuizItem) -> f64 {
        let words = item.words();
        if words.is_empty() {
            return 0.0;
        }
        words.iter().map(|w| self.feedback(w)).sum::<f64>() / words.len() as f64
    }

    pub fn updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, WordOutcome::Updated { .. }))
            .count()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &WordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, WordOutcome::Rejected { .. }))
    }
}

/// Write every score to the store, isolating per-word failures.
///
/// Only a database-level failure aborts the loop; those mean the store
/// itself is unusable rather than one score being bad.
pub fn apply_scores(store: &WordStore, scores: &WordScores) -> Result<MasteryReport, StoreError> {
    let mut report = MasteryReport::default();
    for (word, &rating) in scores {
        match store.update_understanding_rating(word, rating) {
            Ok(()) => {
                tracing::debug!("rating for '{word}' set to {rating:.2}");
                report.outcomes.push(WordOutcome::Updated {
                    word: word.clone(),
                    rating,
                });
            }
            Err(e @ (StoreError::NotFound(_) | StoreError::OutOfRange { .. })) => {
                tracing::warn!("score for '{word}' not applied: {e}");
                report.outcomes.push(WordOutcome::Rejected {
                    word: word.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::quiz::{Matching, ScenarioBased};
    use crate::model::{CefrLevel, ExamFlags};

    fn store() -> WordStore {
        let store = WordStore::open_in_memory().unwrap();
        store
            .add("apple", &[1.0, 0.0], CefrLevel::A1, ExamFlags::default())
            .unwrap();
        store
            .add("car", &[0.0, 1.0], CefrLevel::A1, ExamFlags::default())
            .unwrap();
        store
    }

    fn scores(pairs: &[(&str, f64)]) -> WordScores {
        pairs.iter().map(|(w, r)| (w.to_string(), *r)).collect()
    }

    #[test]
    fn applies_valid_scores() {
        let store = store();
        let report = apply_scores(&store, &scores(&[("apple", 0.9)])).unwrap();
        assert_eq!(report.updated(), 1);
        assert_eq!(report.feedback("apple"), 0.9);

        let all = store.query_all().unwrap();
        let apple = all.iter().find(|e| e.word == "apple").unwrap();
        assert_eq!(apple.understanding_rating, 0.9);
    }

    #[test]
    fn one_bad_score_does_not_block_the_others() {
        let store = store();
        store.update_understanding_rating("car", 0.3).unwrap();

        let report = apply_scores(
            &store,
            &scores(&[("apple", 0.7), ("car", 1.7), ("zebra", 0.4)]),
        )
        .unwrap();

        assert_eq!(report.updated(), 1);
        assert_eq!(report.rejected().count(), 2);
        assert_eq!(report.feedback("apple"), 0.7);
        assert_eq!(report.feedback("car"), 0.0);
        assert_eq!(report.feedback("zebra"), 0.0);

        assert_eq!(store.get("apple").unwrap().unwrap().understanding_rating, 0.7);
        assert_eq!(store.get("car").unwrap().unwrap().understanding_rating, 0.3);
    }

    #[test]
    fn last_write_wins() {
        let store = store();
        apply_scores(&store, &scores(&[("apple", 0.2)])).unwrap();
        apply_scores(&store, &scores(&[("apple", 0.6)])).unwrap();
        assert_eq!(store.get("apple").unwrap().unwrap().understanding_rating, 0.6);
    }

    #[test]
    fn item_score_averages_effective_feedback() {
        let store = store();
        let item = QuizItem::Matching(Matching {
            words: vec!["apple".into(), "car".into()],
            definitions: vec!["a vehicle".into(), "a fruit".into()],
            correct_matches: [(1, "B".to_string()), (2, "A".to_string())]
                .into_iter()
                .collect(),
        });
        let report = apply_scores(&store, &scores(&[("apple", 0.8), ("car", -1.0)])).unwrap();
        assert!((report.item_score(&item) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn missing_word_has_zero_feedback() {
        let report = MasteryReport::default();
        let item = QuizItem::ScenarioBased(ScenarioBased {
            word: "apple".into(),
            scenario: "s".into(),
            question: "q".into(),
            answer: "a".into(),
        });
        assert_eq!(report.item_score(&item), 0.0);
    }

    #[test]
    fn outcomes_serialize_with_status() {
        let outcome = WordOutcome::Rejected {
            word: "zebra".into(),
            reason: "word not found: zebra".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(outcome.word(), "zebra");
    }
}
