//! JSON recovery from model output

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fenced_block() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").ok())
        .as_ref()
}

/// Pull a JSON object out of free-form model output
///
/// Tries, in order: the whole text, a fenced ```` ```json ```` block, and the
/// span from the first `{` to the last `}`.
#[must_use]
pub fn recover_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(value) = fenced_block()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
        .and_then(|m| serde_json::from_str(m.as_str()).ok())
    {
        return Some(value);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}
