//! Pulls a single JSON object out of free-form model output.
//!
//! Strict parse first; failing that, the first balanced top-level `{...}` found by a
//! string-aware depth scan. Anything else is a [`AnalyzerError::ResponseParse`].

use crate::error::{AnalyzerError, Result};
use serde_json::{Map, Value};

/// Straightens typographic quotes so JSON delimiters parse.
pub fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

pub fn parse_object(text: &str) -> Result<Map<String, Value>> {
    let trimmed = text.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(map);
    }

    let mut search_from = 0;
    while let Some(rel) = trimmed[search_from..].find('{') {
        let start = search_from + rel;
        match balanced_end(&trimmed[start..]) {
            Some(len) => {
                let candidate = &trimmed[start..start + len];
                if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
                    return Ok(map);
                }
                search_from = start + 1;
            }
            None => break,
        }
    }

    Err(AnalyzerError::ResponseParse(format!(
        "no JSON object in response ({} chars)",
        text.len()
    )))
}

/// Byte length of the balanced object starting at `s[0] == '{'`, if it closes.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Convenience accessors for loosely typed model output.
pub(crate) fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub(crate) fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}
