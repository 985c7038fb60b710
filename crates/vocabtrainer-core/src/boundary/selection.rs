//! Word selector request/response contract.
//!
//! The selector receives the candidate table and a target count and answers
//! with word strings. Those strings are never trusted: each one is checked
//! against the store and anything unknown is discarded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extract_json_from_markdown;
use crate::error::{FormatError, PipelineError};
use crate::model::{CandidateSet, WordEntry};
use crate::store::WordStore;

/// Validated selector output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Distinct known words, in the selector's order, at most `k`.
    pub words: Vec<String>,
    /// Returned words that were dropped as unknown.
    pub discarded: Vec<String>,
}

/// Render candidates as the `word, CEFR, rating` table the selector reads.
pub fn render_candidate_table(candidates: &CandidateSet) -> String {
    candidates
        .iter()
        .map(|c| format!("{}, {}, {:.2}", c.word, c.cefr_level, c.understanding_rating))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render whole store rows as `word, CEFR, rating, IELTS, GRE` for the
/// baseline selector.
pub fn render_vocab_table(entries: &[WordEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "{}, {}, {:.2}, {}, {}",
                e.word,
                e.cefr_level,
                e.understanding_rating,
                u8::from(e.in_exam.ielts),
                u8::from(e.in_exam.gre)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercased, deduplicated selector words, at most `k`, unchecked against
/// the store so that quality scoring can count invented words.
pub fn parse_word_list(response: &str, k: usize) -> Result<Vec<String>, FormatError> {
    let mut words: Vec<String> = Vec::with_capacity(k);
    for word in parse_selection_response(response) {
        let word = word.to_lowercase();
        if words.len() == k {
            break;
        }
        if !words.contains(&word) {
            words.push(word);
        }
    }
    if words.is_empty() {
        return Err(FormatError::Empty("selection has no words".into()));
    }
    Ok(words)
}

/// Extract the word list from a selector response.
///
/// Accepts a JSON array, a `{"words": [...]}` object, or one word per line.
/// Line form tolerates list markers, quotes and trailing table columns.
pub fn parse_selection_response(response: &str) -> Vec<String> {
    let payload = extract_json_from_markdown(response);
    if let Ok(value) = serde_json::from_str::<Value>(&payload) {
        let items = match &value {
            Value::Array(items) => Some(items),
            Value::Object(map) => match map.get("words") {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            },
            _ => None,
        };
        if let Some(items) = items {
            return items
                .iter()
                .filter_map(Value::as_str)
                .map(clean_word)
                .filter(|w| !w.is_empty())
                .collect();
        }
    }

    response
        .lines()
        .map(|line| {
            let line = strip_list_marker(line.trim());
            let first = line.split(',').next().unwrap_or_default();
            clean_word(first)
        })
        .filter(|w| !w.is_empty() && !w.starts_with("```"))
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim_start();
        }
    }
    line
}

fn clean_word(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
        .trim()
        .to_string()
}

/// Keep the first `k` distinct words the store knows about.
///
/// Unknown words go to `discarded`. Matching falls back to the lower-cased
/// form, since the selector sometimes capitalizes. Zero surviving words is an
/// upstream format error.
pub fn validate_selection(
    words: Vec<String>,
    k: usize,
    store: &WordStore,
) -> Result<Selection, PipelineError> {
    let mut selection = Selection::default();

    for word in words {
        if selection.words.len() >= k {
            break;
        }
        let resolved = if store.contains(&word)? {
            Some(word.clone())
        } else {
            let lower = word.to_lowercase();
            store.contains(&lower)?.then_some(lower)
        };
        match resolved {
            Some(known) if !selection.words.contains(&known) => selection.words.push(known),
            Some(_) => {}
            None => {
                tracing::warn!("discarding unknown word from selector: {word}");
                selection.discarded.push(word);
            }
        }
    }

    if selection.words.is_empty() {
        return Err(PipelineError::format(
            "word selector",
            FormatError::Empty("no known words in selection".into()),
        ));
    }
    Ok(selection)
}
