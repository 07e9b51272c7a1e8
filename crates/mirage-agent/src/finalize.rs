//! Turns the model's final content into the JSON response body.

use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fenced block pattern is valid")
});

/// Coerce the model's final content into a JSON value. Never fails.
///
/// Tries, in order: the content as JSON, the first fenced code block as
/// JSON, then wraps the raw text as `{"status": "success", "result": ...}`.
pub fn finalize(content: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return value;
    }

    if let Some(caps) = FENCED_BLOCK.captures(content)
        && let Ok(value) = serde_json::from_str::<Value>(&caps[1])
    {
        return value;
    }

    json!({"status": "success", "result": content})
}
