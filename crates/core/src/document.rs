use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document handed to the analyzers: its text, and the structured extraction
/// when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub filename: String,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub extracted: Option<Value>,
}

impl SourceDocument {
    pub fn from_text(filename: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            raw_text: raw_text.into(),
            extracted: None,
        }
    }

    pub fn from_extraction(filename: impl Into<String>, extracted: Value) -> Self {
        let raw_text = extracted
            .get("raw_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            filename: filename.into(),
            raw_text,
            extracted: Some(extracted),
        }
    }

    /// The raw text, or text rebuilt from the extraction when there is none.
    pub fn full_text(&self) -> String {
        if !self.raw_text.trim().is_empty() {
            return self.raw_text.clone();
        }
        self.extracted
            .as_ref()
            .map(full_text_from_extraction)
            .unwrap_or_default()
    }

    /// Context for the basic analyzer: the extraction, or the text wrapped as one.
    pub fn structured(&self) -> Value {
        match &self.extracted {
            Some(v) => v.clone(),
            None => serde_json::json!({
                "filename": self.filename,
                "raw_text": self.raw_text,
            }),
        }
    }
}

/// Analysis text for an extraction record: `raw_text` when present, otherwise the
/// problem statement, objectives, tasks, KPIs and deliverables joined by blank lines.
pub fn full_text_from_extraction(extracted: &Value) -> String {
    if let Some(raw) = extracted.get("raw_text").and_then(Value::as_str) {
        if !raw.trim().is_empty() {
            return raw.to_string();
        }
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(problem) = extracted
        .pointer("/background/problem_statement")
        .and_then(Value::as_str)
    {
        if problem != "NOT_FOUND" {
            parts.push(problem.to_string());
        }
    }
    parts.extend(items(extracted, "objectives").filter_map(|o| text_of(o, "text")));
    parts.extend(items(extracted, "tasks").map(|t| {
        format!(
            "Task {}: {} - {}",
            text_of(t, "task_id").unwrap_or_default(),
            text_of(t, "title").unwrap_or_default(),
            text_of(t, "description").unwrap_or_default()
        )
    }));
    parts.extend(items(extracted, "kpis").filter_map(|k| text_of(k, "text")));
    parts.extend(
        items(extracted, "deliverables")
            .filter_map(|d| text_of(d, "name"))
            .map(|name| format!("Deliverable: {name}")),
    );
    parts.join("\n\n")
}

fn items<'a>(v: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .into_iter()
        .flatten()
}

fn text_of(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
