//! Answer scorer response contract: a JSON object mapping word → rating.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{json_kind, parse_object};
use crate::boundary::quiz::QuizItem;
use crate::error::FormatError;

/// Ratings keyed by word, as returned by the scorer.
pub type WordScores = BTreeMap<String, f64>;

/// Validate a scorer response for `item`.
///
/// Every word the item tests must be present and every value must be a
/// number. Range and vocabulary membership are not checked here; the mastery
/// update applies those per word so one bad value cannot sink the others.
pub fn parse_scores(response: &str, item: &QuizItem) -> Result<WordScores, FormatError> {
    let map = parse_object(response)?;

    let mut scores = WordScores::new();
    for (word, value) in &map {
        let rating = match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| FormatError::invalid(word.clone(), "not representable as f64"))?,
            other => {
                return Err(FormatError::wrong_type(
                    word.clone(),
                    format!("a number, found {}", json_kind(other)),
                ))
            }
        };
        scores.insert(word.trim().to_string(), rating);
    }

    for word in item.words() {
        if !scores.contains_key(word) {
            return Err(FormatError::MissingField(word.to_string()));
        }
    }
    Ok(scores)
}
