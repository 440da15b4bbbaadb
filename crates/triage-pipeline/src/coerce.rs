//! Field coercion from loosely-typed model objects into `TaskRecord`s.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use triage_types::{Importance, Result, TaskRecord};

use crate::extract::{cached_regex, TaskObject};

/// Score used when the model supplies something that is not a number.
pub const FALLBACK_SCORE: f64 = 5.0;

static HASHTAG: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

/// Task fields as produced by the parse stage.
pub fn parsed_task(obj: &TaskObject) -> Result<TaskRecord> {
    Ok(TaskRecord::parsed(
        text_field(obj, "description"),
        text_field(obj, "due_date"),
        coerce_tags(obj.get("tags"))?,
    ))
}

/// Task fields as produced by the prioritization stage.
pub fn prioritized_task(obj: &TaskObject) -> Result<TaskRecord> {
    let importance = Importance::from_label(&text_field(obj, "importance"));
    let score = coerce_score(obj.get("priority_score"));
    Ok(parsed_task(obj)?.prioritized(importance, score))
}

/// String value of `key`; other JSON kinds render as their JSON text and a
/// missing or null value is empty.
pub fn text_field(obj: &TaskObject, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Normalize a `tags` value into a list.
///
/// Arrays are kept in order. Text is split on commas when it has any,
/// otherwise `#word` tokens are pulled out, otherwise the trimmed text is a
/// single tag.
pub fn coerce_tags(value: Option<&Value>) -> Result<Vec<String>> {
    let tags = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(text)) if text.contains(',') => text
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(text)) => {
            let re = cached_regex(&HASHTAG, r"#(\w+)")?;
            let hashtags: Vec<String> = re
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .collect();
            if !hashtags.is_empty() {
                hashtags
            } else if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text.trim().to_string()]
            }
        }
        _ => Vec::new(),
    };
    Ok(tags)
}

/// Coerce `priority_score` to a float. A missing score is 0.0; anything that
/// is not a finite number falls back to [`FALLBACK_SCORE`].
pub fn coerce_score(value: Option<&Value>) -> f64 {
    let score = match value {
        None => return 0.0,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    score.filter(|s| s.is_finite()).unwrap_or(FALLBACK_SCORE)
}
