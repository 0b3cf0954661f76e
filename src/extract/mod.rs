//! Best-effort structured extraction from model output.
//!
//! Models wrap JSON in prose and markdown fences, truncate it, or ignore
//! the format entirely. Extraction tries, in order:
//!
//! 1. the greedy span from the first opening bracket to the last matching
//!    closing one,
//! 2. every balanced, string-aware bracketed span, left to right,
//! 3. the whole text.
//!
//! The first candidate that parses wins. For lists there is a final line
//! heuristic, so [`extract_list`] always returns something usable.

mod coerce;

use serde_json::Value;

use crate::types::Record;
use crate::{Result, SouschefError, telemetry};

/// Confidence assigned to names recovered by the line heuristic.
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

/// Most items the line heuristic will return.
pub const FALLBACK_LIMIT: usize = 10;

/// Find the first JSON value embedded in `text`.
pub fn find_json(text: &str) -> Option<Value> {
    if let Some(span) = greedy_span(text)
        && let Ok(value) = serde_json::from_str(span)
    {
        return Some(value);
    }
    for span in BalancedSpans::new(text) {
        if let Ok(value) = serde_json::from_str(span) {
            return Some(value);
        }
    }
    serde_json::from_str(text.trim()).ok()
}

/// Records from a JSON list in `text`, if there is one.
///
/// Strings in the list become `{"name": …}` records. An object that wraps
/// exactly one array (`{"ingredients": [...]}`) yields that array; any other
/// object is a single record.
pub fn json_records(text: &str) -> Option<Vec<Record>> {
    match find_json(text)? {
        Value::Array(items) => Some(items_to_records(items)),
        Value::Object(map) => {
            let wrapped = {
                let mut arrays = map.values().filter(|v| v.is_array());
                match (arrays.next(), arrays.next()) {
                    (Some(Value::Array(items)), None) => Some(items.clone()),
                    _ => None,
                }
            };
            match wrapped {
                Some(items) => Some(items_to_records(items)),
                None => Some(vec![map]),
            }
        }
        _ => None,
    }
}

/// Records from `text`, falling back to one name per line.
///
/// Never fails. Fallback records carry `name` and a fixed `confidence`.
pub fn extract_list(text: &str) -> Vec<Record> {
    if let Some(records) = json_records(text) {
        return records;
    }
    metrics::counter!(telemetry::EXTRACTION_FALLBACKS_TOTAL).increment(1);
    fallback_names(text)
        .into_iter()
        .map(|name| {
            let mut record = Record::new();
            record.insert("name".into(), Value::String(name));
            record.insert("confidence".into(), Value::from(FALLBACK_CONFIDENCE));
            record
        })
        .collect()
}

/// The JSON object in `text`.
pub fn extract_object(text: &str) -> Result<Record> {
    match find_json(text) {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(SouschefError::MalformedResponse(format!(
            "expected a JSON object, found {}",
            kind_name(&other)
        ))),
        None => Err(SouschefError::MalformedResponse(
            "no JSON object in model output".into(),
        )),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn items_to_records(items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            Value::String(name) if !name.trim().is_empty() => {
                let mut record = Record::new();
                record.insert("name".into(), Value::String(name.trim().to_string()));
                Some(record)
            }
            _ => None,
        })
        .collect()
}

fn closer(open: char) -> char {
    if open == '{' { '}' } else { ']' }
}

/// First opening bracket through the last matching closing bracket.
fn greedy_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let open = text[start..].chars().next()?;
    let end = text.rfind(closer(open))?;
    (end > start).then(|| &text[start..=end])
}

/// Balanced bracketed spans, in order of their opening bracket.
///
/// Brackets inside JSON strings are ignored. A span that never closes is
/// skipped.
struct BalancedSpans<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> BalancedSpans<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn span_from(&self, start: usize) -> Option<usize> {
        let mut stack = Vec::new();
        let mut in_string = false;
        let mut escaped = false;
        for (offset, c) in self.text[start..].char_indices() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '{' | '[' => stack.push(closer(c)),
                '}' | ']' => {
                    if stack.pop() != Some(c) {
                        return None;
                    }
                    if stack.is_empty() {
                        return Some(start + offset);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

impl<'a> Iterator for BalancedSpans<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos < self.text.len() {
            let rel = self.text[self.pos..].find(['{', '['])?;
            let start = self.pos + rel;
            self.pos = start + 1;
            if let Some(end) = self.span_from(start) {
                return Some(&self.text[start..=end]);
            }
        }
        None
    }
}

/// One name per line: skip blanks, fences and JSON-looking lines, strip
/// bullets and numbering, keep the text before the first comma.
fn fallback_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("```")
                && !line.starts_with('[')
                && !line.starts_with('{')
        })
        .filter_map(|line| {
            let stripped = line
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || matches!(c, '-' | '•' | '*' | '.' | ')')
                })
                .trim_start();
            let name = stripped.split(',').next().unwrap_or("").trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .take(FALLBACK_LIMIT)
        .collect()
}
