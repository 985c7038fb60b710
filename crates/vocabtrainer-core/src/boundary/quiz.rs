//! Quiz builder response contract.
//!
//! The builder answers with an object holding four arrays keyed
//! `multiple-choice`, `matching`, `short-answer` and `scenario-based`.
//! Raw items are deserialized into intermediate structs, then checked for
//! internal consistency and for testing only words that were selected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::extract_json_from_markdown;
use crate::error::FormatError;

/// A multiple-choice question: pick the word matching a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoice {
    pub word: String,
    pub question: String,
    pub choices: Vec<String>,
    /// Letter of the correct choice, "A" for the first.
    pub correct_option: String,
}

/// Match each word to one of the definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matching {
    pub words: Vec<String>,
    pub definitions: Vec<String>,
    /// 1-based word position → definition letter.
    pub correct_matches: BTreeMap<usize, String>,
}

/// Explain a word's meaning in free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswer {
    pub word: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Use a word appropriately in a described situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBased {
    pub word: String,
    pub scenario: String,
    pub question: String,
    pub answer: String,
}

/// One quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuizItem {
    MultipleChoice(MultipleChoice),
    Matching(Matching),
    ShortAnswer(ShortAnswer),
    ScenarioBased(ScenarioBased),
}

impl QuizItem {
    /// Wire name of the item's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            QuizItem::MultipleChoice(_) => "multiple-choice",
            QuizItem::Matching(_) => "matching",
            QuizItem::ShortAnswer(_) => "short-answer",
            QuizItem::ScenarioBased(_) => "scenario-based",
        }
    }

    /// Every word this item tests.
    pub fn words(&self) -> Vec<&str> {
        match self {
            QuizItem::MultipleChoice(q) => vec![q.word.as_str()],
            QuizItem::Matching(q) => q.words.iter().map(String::as_str).collect(),
            QuizItem::ShortAnswer(q) => vec![q.word.as_str()],
            QuizItem::ScenarioBased(q) => vec![q.word.as_str()],
        }
    }

    /// Human-readable canonical answer, used for feedback.
    pub fn correct_answer(&self) -> Option<String> {
        match self {
            QuizItem::MultipleChoice(q) => {
                let idx = option_index(&q.correct_option)?;
                let choice = q.choices.get(idx)?;
                Some(format!("{}. {}", q.correct_option, choice))
            }
            QuizItem::Matching(q) => Some(
                q.correct_matches
                    .iter()
                    .map(|(pos, letter)| format!("{pos}-{letter}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            QuizItem::ShortAnswer(q) => q.answer.clone(),
            QuizItem::ScenarioBased(q) => Some(q.answer.clone()),
        }
    }
}

/// A validated quiz, grouped by kind in wire order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub items: Vec<QuizItem>,
}

impl Quiz {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuizItem> {
        self.items.iter()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuiz {
    #[serde(rename = "multiple-choice", default)]
    multiple_choice: Vec<RawMultipleChoice>,
    #[serde(default)]
    matching: Vec<RawMatching>,
    #[serde(rename = "short-answer", default)]
    short_answer: Vec<ShortAnswer>,
    #[serde(rename = "scenario-based", default)]
    scenario_based: Vec<ScenarioBased>,
}

#[derive(Debug, Deserialize)]
struct RawMultipleChoice {
    word: String,
    question: String,
    choices: Vec<String>,
    #[serde(alias = "correct_answer")]
    correct_option: String,
}

#[derive(Debug, Deserialize)]
struct RawMatching {
    words: Vec<String>,
    definitions: Vec<String>,
    correct_matches: BTreeMap<String, String>,
}

/// Validate a quiz builder response against the selected word list.
pub fn parse_quiz(response: &str, selected: &[String]) -> Result<Quiz, FormatError> {
    let payload = extract_json_from_markdown(response);
    let value: serde_json::Value =
        serde_json::from_str(&payload).map_err(|e| FormatError::NotJson(e.to_string()))?;
    if !value.is_object() {
        return Err(FormatError::NotAnObject(
            super::json_kind(&value).to_string(),
        ));
    }
    let raw: RawQuiz = serde_json::from_value(value)
        .map_err(|e| FormatError::invalid("quiz", e.to_string()))?;

    let mut items = Vec::new();

    for (i, q) in raw.multiple_choice.into_iter().enumerate() {
        let ctx = format!("multiple-choice[{i}]");
        let item = MultipleChoice {
            word: q.word.trim().to_string(),
            question: q.question,
            choices: q.choices,
            correct_option: q.correct_option.trim().to_uppercase(),
        };
        if item.choices.len() < 2 {
            return Err(FormatError::invalid(
                format!("{ctx}.choices"),
                "needs at least two choices",
            ));
        }
        match option_index(&item.correct_option) {
            Some(idx) if idx < item.choices.len() => {}
            _ => {
                return Err(FormatError::invalid(
                    format!("{ctx}.correct_option"),
                    format!("'{}' does not name a choice", item.correct_option),
                ))
            }
        }
        items.push(QuizItem::MultipleChoice(item));
    }

    for (i, q) in raw.matching.into_iter().enumerate() {
        let ctx = format!("matching[{i}]");
        let words: Vec<String> = q.words.iter().map(|w| w.trim().to_string()).collect();
        if words.is_empty() {
            return Err(FormatError::invalid(format!("{ctx}.words"), "is empty"));
        }
        if words.len() != q.definitions.len() {
            return Err(FormatError::invalid(
                ctx,
                format!(
                    "{} words but {} definitions",
                    words.len(),
                    q.definitions.len()
                ),
            ));
        }
        let mut correct_matches = BTreeMap::new();
        for pos in 1..=words.len() {
            let key = pos.to_string();
            let Some(letter) = q.correct_matches.get(&key) else {
                return Err(FormatError::MissingField(format!(
                    "{ctx}.correct_matches.{key}"
                )));
            };
            let letter = letter.trim().to_uppercase();
            if !option_index(&letter).is_some_and(|idx| idx < q.definitions.len()) {
                return Err(FormatError::invalid(
                    format!("{ctx}.correct_matches.{key}"),
                    format!("'{letter}' does not name a definition"),
                ));
            }
            correct_matches.insert(pos, letter);
        }
        items.push(QuizItem::Matching(Matching {
            words,
            definitions: q.definitions,
            correct_matches,
        }));
    }

    for q in raw.short_answer {
        items.push(QuizItem::ShortAnswer(ShortAnswer {
            word: q.word.trim().to_string(),
            ..q
        }));
    }

    for q in raw.scenario_based {
        items.push(QuizItem::ScenarioBased(ScenarioBased {
            word: q.word.trim().to_string(),
            ..q
        }));
    }

    for item in &items {
        for word in item.words() {
            if !selected.iter().any(|s| s == word) {
                return Err(FormatError::UnknownWord(word.to_string()));
            }
        }
    }

    if items.is_empty() {
        return Err(FormatError::Empty("quiz has no questions".into()));
    }
    Ok(Quiz { items })
}

/// "A" → 0, "B" → 1, ...
fn option_index(letter: &str) -> Option<usize> {
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'A'..='Z'), None) => Some(c as usize - 'A' as usize),
        _ => None,
    }
}
