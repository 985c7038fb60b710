//! Goal interpreter response contract.
//!
//! Expected shape:
//! `{"exam": "IELTS" | null, "topic": "travel" | null, "keywords": ["airport", ...]}`

use serde_json::Value;

use super::{json_kind, optional_str, parse_object};
use crate::error::FormatError;
use crate::model::Intent;

const FIELDS: [&str; 3] = ["exam", "topic", "keywords"];

/// Validate and normalize a goal interpreter response.
///
/// The exam is upper-cased, topic and keywords lower-cased; blank and
/// repeated keywords are dropped. An empty keyword list is valid and leaves
/// nothing to retrieve. An exam name the store does not know is kept as-is:
/// deciding what it means is the retriever's job.
pub fn parse_intent(response: &str) -> Result<Intent, FormatError> {
    let map = parse_object(response)?;

    if let Some(extra) = map.keys().find(|k| !FIELDS.contains(&k.as_str())) {
        return Err(FormatError::UnexpectedField(extra.clone()));
    }
    for field in FIELDS {
        if !map.contains_key(field) {
            return Err(FormatError::MissingField(field.to_string()));
        }
    }

    let exam = optional_str(&map, "exam", "intent")?
        .filter(|e| !e.is_empty())
        .map(|e| e.to_uppercase());
    let topic = optional_str(&map, "topic", "intent")?
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase());

    let Some(Value::Array(raw_keywords)) = map.get("keywords") else {
        let found = map.get("keywords").map(json_kind).unwrap_or("nothing");
        return Err(FormatError::wrong_type(
            "intent.keywords",
            format!("an array of strings, found {found}"),
        ));
    };

    let mut keywords: Vec<String> = Vec::with_capacity(raw_keywords.len());
    for item in raw_keywords {
        let Value::String(keyword) = item else {
            return Err(FormatError::wrong_type(
                "intent.keywords",
                "an array of strings",
            ));
        };
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    Ok(Intent {
        exam,
        topic,
        keywords,
    })
}
