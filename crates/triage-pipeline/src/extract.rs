//! Structured-extraction engine.
//!
//! Turns free-form model output into a validated list of JSON objects. Each
//! stage is a separate function so it can be tested on its own:
//!
//! 1. [`find_fenced_block`] locates an untagged or ```` ```json ```` block.
//! 2. [`find_array_literal`] falls back to the first bracket-balanced `[{ ... }]`.
//! 3. [`parse_strict`] runs a strict JSON parse on the candidate.
//! 4. [`repair`] normalizes single quotes and quotes bare keys, then one retry.
//! 5. [`validate_shape`] requires an array whose elements are all objects.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use triage_types::{Result, TriageError};

/// Number of response characters carried in an extraction diagnostic.
const SNIPPET_CHARS: usize = 100;

pub type TaskObject = Map<String, Value>;

static FENCED_BLOCK: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

/// Compile `pattern` once into `cell`.
pub(crate) fn cached_regex(
    cell: &'static OnceLock<std::result::Result<Regex, regex::Error>>,
    pattern: &str,
) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| TriageError::Internal(format!("invalid pattern {pattern:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Extract an ordered list of task objects from model output.
pub fn extract(text: &str) -> Result<Vec<TaskObject>> {
    let candidate = locate_candidate(text)?;

    let value = match parse_strict(candidate) {
        Ok(value) => value,
        Err(first_err) => {
            let repaired = repair(candidate);
            match parse_strict(&repaired) {
                Ok(value) => {
                    tracing::debug!(error = %first_err, "Model output parsed after repair");
                    value
                }
                Err(_) => {
                    return Err(TriageError::Extraction {
                        snippet: snippet(text),
                        message: first_err.to_string(),
                    })
                }
            }
        }
    };

    validate_shape(value)
}

/// Pick the text to parse: fenced block, else array literal, else the whole
/// trimmed response.
pub fn locate_candidate(text: &str) -> Result<&str> {
    if let Some(block) = find_fenced_block(text)? {
        return Ok(block);
    }
    Ok(find_array_literal(text).unwrap_or_else(|| text.trim()))
}

// ---------------------------------------------------------------------------
// Candidate location
// ---------------------------------------------------------------------------

/// Inner text of the first fenced code block that is untagged or tagged
/// `json`. Blocks in other languages are skipped.
pub fn find_fenced_block(text: &str) -> Result<Option<&str>> {
    let re = cached_regex(
        &FENCED_BLOCK,
        r"(?s)`{3,}[ \t]*([A-Za-z0-9_+-]*)\s*(.*?)\s*`{3,}",
    )?;
    Ok(re
        .captures_iter(text)
        .find(|caps| {
            let tag = caps.get(1).map_or("", |m| m.as_str());
            tag.is_empty() || tag.eq_ignore_ascii_case("json")
        })
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str()))
}

/// First bracket-balanced array literal whose first element is an object.
///
/// Brackets inside single- or double-quoted strings are ignored.
pub fn find_array_literal(text: &str) -> Option<&str> {
    for (start, _) in text.match_indices('[') {
        let rest = &text[start + 1..];
        if !rest.trim_start().starts_with('{') {
            continue;
        }
        if let Some(len) = balanced_len(&text[start..]) {
            return Some(&text[start..start + len]);
        }
    }
    None
}

/// Byte length of the balanced bracket group at the start of `s`.
fn balanced_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Parsing and repair
// ---------------------------------------------------------------------------

pub fn parse_strict(candidate: &str) -> std::result::Result<Value, serde_json::Error> {
    serde_json::from_str(candidate)
}

/// Both repair passes, in order.
pub fn repair(candidate: &str) -> String {
    quote_bare_keys(&normalize_quotes(candidate))
}

/// Rewrite single-quoted strings as double-quoted ones.
///
/// Double-quoted strings pass through untouched, so valid JSON is unchanged.
pub fn normalize_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            None => match c {
                '"' => {
                    quote = Some('"');
                    out.push('"');
                }
                '\'' => {
                    quote = Some('\'');
                    out.push('"');
                }
                _ => out.push(c),
            },
            Some(q) => match c {
                '\\' => match chars.next() {
                    // \' is not a JSON escape
                    Some('\'') => out.push('\''),
                    Some(next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                },
                '"' if q == '\'' => out.push_str("\\\""),
                c if c == q => {
                    quote = None;
                    out.push('"');
                }
                _ => out.push(c),
            },
        }
    }
    out
}

/// Quote identifier keys that follow `{` or `,` and precede `:`.
pub fn quote_bare_keys(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 16);
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;

        if in_string {
            if c == '\\' {
                if let Some(&next) = chars.get(i) {
                    out.push(next);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | ',' => {
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let key_start = j;
                while j < chars.len() && is_word_char(chars[j]) {
                    j += 1;
                }
                let key_end = j;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if key_end > key_start && chars.get(j) == Some(&':') {
                    out.extend(&chars[i..key_start]);
                    out.push('"');
                    out.extend(&chars[key_start..key_end]);
                    out.push('"');
                    i = key_end;
                }
            }
            _ => {}
        }
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Shape validation
// ---------------------------------------------------------------------------

/// Require a top-level array of objects.
pub fn validate_shape(value: Value) -> Result<Vec<TaskObject>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(TriageError::Shape {
                expected: "a list of tasks".into(),
                actual: kind_of(&other).into(),
            })
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(TriageError::Shape {
                expected: "a task object".into(),
                actual: kind_of(&other).into(),
            }),
        })
        .collect()
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_block_is_preferred() {
        let text = "Sure! Here are your tasks:\n```json\n[{\"description\": \"A\"}]\n```\nAnything else? [{\"x\": 1}]";
        assert_eq!(
            find_fenced_block(text).unwrap(),
            Some("[{\"description\": \"A\"}]")
        );
        let tasks = extract(text).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["description"], "A");
    }

    #[test]
    fn fenced_block_on_one_line() {
        let text = r#"```json [{"description":"Finish report","due_date":"","tags":["work"]}] ```"#;
        let tasks = extract(text).unwrap();
        assert_eq!(tasks[0]["tags"], json!(["work"]));
    }

    #[test]
    fn untagged_fence_is_accepted() {
        let text = "```\n[{\"description\": \"B\"}]\n```";
        assert_eq!(extract(text).unwrap()[0]["description"], "B");
    }

    #[test]
    fn other_language_fence_is_skipped() {
        let text = "Run this first:\n```python\nprint(1)\n```\nThen: [{\"description\": \"C\"}]";
        assert_eq!(find_fenced_block(text).unwrap(), None);
        assert_eq!(extract(text).unwrap()[0]["description"], "C");
    }

    #[test]
    fn json_fence_after_other_language_fence() {
        let text = "```sh\nls\n```\n```JSON\n[{\"description\": \"D\"}]\n```";
        assert_eq!(
            find_fenced_block(text).unwrap(),
            Some("[{\"description\": \"D\"}]")
        );
    }

    #[test]
    fn array_literal_found_in_prose() {
        let text = "The tasks are [ {\"description\": \"C [draft]\"} ] as requested.";
        assert_eq!(
            find_array_literal(text),
            Some("[ {\"description\": \"C [draft]\"} ]")
        );
    }

    #[test]
    fn array_literal_skips_plain_brackets() {
        let text = "Notes [1] and [see below]: [{\"description\": \"D\"}]";
        assert_eq!(find_array_literal(text), Some("[{\"description\": \"D\"}]"));
    }

    #[test]
    fn unbalanced_array_is_not_a_literal() {
        assert_eq!(find_array_literal("[{\"description\": \"E\""), None);
    }

    #[test]
    fn bare_json_without_wrapping() {
        let tasks = extract("  [{\"description\": \"F\", \"tags\": []}]  ").unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn repairs_single_quotes_and_bare_keys() {
        let tasks = extract("[{description: 'Task A', tags: ['x']}]").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["description"], "Task A");
        assert_eq!(tasks[0]["tags"], json!(["x"]));
    }

    #[test]
    fn normalize_quotes_escapes_inner_double_quotes() {
        assert_eq!(
            normalize_quotes(r#"{'note': 'say "hi"'}"#),
            r#"{"note": "say \"hi\""}"#
        );
        assert_eq!(normalize_quotes(r"['it\'s']"), r#"["it's"]"#);
    }

    #[test]
    fn normalize_quotes_keeps_apostrophes_inside_double_quotes() {
        let text = r#"[{"description": "Call mom's dentist"}]"#;
        assert_eq!(normalize_quotes(text), text);
    }

    #[test]
    fn quote_bare_keys_leaves_string_contents_alone() {
        assert_eq!(
            quote_bare_keys(r#"{a: 1, b: "x, y: z"}"#),
            r#"{"a": 1, "b": "x, y: z"}"#
        );
    }

    #[test]
    fn repair_is_idempotent_on_valid_json() {
        let samples = [
            r#"[{"description": "A", "tags": ["x", "y"], "priority_score": 7.5}]"#,
            r#"[{"description": "it's {odd}, [really]: yes", "due_date": ""}]"#,
            r#"[ {"a": {"b": [1, true, null]}}, {"c": "\"quoted\""} ]"#,
        ];
        for sample in samples {
            let repaired = repair(sample);
            assert_eq!(
                parse_strict(&repaired).unwrap(),
                parse_strict(sample).unwrap(),
                "repair changed {sample}"
            );
            assert_eq!(repair(&repaired), repaired);
        }
    }

    #[test]
    fn unparseable_output_reports_snippet_and_error() {
        let text = format!("I could not find any tasks. {}", "x".repeat(200));
        let err = extract(&text).unwrap_err();
        match &err {
            TriageError::Extraction { snippet, message } => {
                assert_eq!(snippet.chars().count(), 100);
                assert!(snippet.starts_with("I could not find any tasks."));
                assert!(!message.is_empty());
            }
            other => panic!("expected Extraction, got {other:?}"),
        }
        assert!(err.to_string().starts_with("JSON parsing failed:"));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = "é".repeat(150);
        assert_eq!(snippet(&text).chars().count(), 100);
    }

    #[test]
    fn top_level_object_is_a_shape_error() {
        let err = extract("{\"description\": \"A\"}").unwrap_err();
        assert!(matches!(err, TriageError::Shape { .. }));
        assert_eq!(err.to_string(), "Expected a list of tasks, got object");
    }

    #[test]
    fn non_object_element_is_a_shape_error() {
        let err = validate_shape(json!([{"description": "A"}, "B"])).unwrap_err();
        assert_eq!(err.to_string(), "Expected a task object, got string");
    }

    #[test]
    fn well_formed_arrays_keep_length_and_content() {
        let input = json!([
            {"description": "A", "due_date": "2024-05-01", "tags": ["work"]},
            {"description": "B", "due_date": "", "tags": []},
            {"description": "C", "due_date": "Friday", "tags": ["x", "y"]}
        ]);
        let tasks = extract(&input.to_string()).unwrap();
        assert_eq!(tasks.len(), 3);
        for (task, expected) in tasks.iter().zip(input.as_array().unwrap()) {
            assert_eq!(&Value::Object(task.clone()), expected);
        }
    }
}
