//! Validation of data returned by the generative collaborators.
//!
//! Every LLM response is parsed as untrusted input: shape, types and word
//! membership are checked here before anything downstream sees the data.

pub mod intent;
pub mod quiz;
pub mod scoring;
pub mod selection;

use serde_json::{Map, Value};

use crate::error::FormatError;

/// Pull the JSON payload out of a possibly markdown-wrapped response.
///
/// Handles:
/// - ```json``` blocks (first one wins)
/// - Generic ``` blocks (if no json-specific block is found)
/// - Bare JSON with surrounding chatter (outermost `{ ... }` span)
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_block: Option<String> = None;
    let mut generic_block: Option<String> = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_block.get_or_insert_with(|| current_block.clone());
            } else {
                generic_block.get_or_insert_with(|| current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated (unclosed) block: take what was accumulated
    if in_block && !current_block.is_empty() {
        if is_json_block {
            json_block.get_or_insert(current_block);
        } else {
            generic_block.get_or_insert(current_block);
        }
    }

    if let Some(block) = json_block.or(generic_block) {
        return block.trim().to_string();
    }

    let trimmed = response.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

/// Parse a response into a top-level JSON object.
pub(crate) fn parse_object(response: &str) -> Result<Map<String, Value>, FormatError> {
    let payload = extract_json_from_markdown(response);
    let value: Value =
        serde_json::from_str(&payload).map_err(|e| FormatError::NotJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(FormatError::NotAnObject(json_kind(&other).to_string())),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Optional string field; `null` and absence both read as `None`.
pub(crate) fn optional_str(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<String>, FormatError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(FormatError::wrong_type(format!("{context}.{key}"), "a string")),
    }
}
