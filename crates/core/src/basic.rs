//! Fallback analysis: one model call over the structured extraction, no retrieval.

use crate::error::{AnalyzerError, Result};
use crate::models::{AnalysisResult, Category, Finding, IssueType, Level};
use crate::prompts;
use crate::response::{normalize_quotes, parse_object, str_field};
use providers::retry::{call_with_retry, RetryPolicy};
use providers::{CompletionRequest, LlmProvider};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BasicRiskAnalyzer {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    policy: RetryPolicy,
}

impl BasicRiskAnalyzer {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, policy: RetryPolicy) -> Self {
        Self {
            llm,
            max_tokens,
            policy,
        }
    }

    /// Unlike the retrieval path, failures here are returned: there is nothing
    /// left to fall back to.
    pub async fn analyze_basic(&self, extracted: &Value) -> Result<AnalysisResult> {
        let sow_data = serde_json::to_string_pretty(extracted)?;
        let req = CompletionRequest::deterministic(prompts::basic_analysis(&sow_data), self.max_tokens);
        let resp = call_with_retry(&self.policy, || self.llm.complete(&req)).await?;
        let obj = parse_object(&normalize_quotes(&resp.text)).map_err(|e| {
            warn!(error = %e, "basic analysis response unreadable");
            e
        })?;
        let result = result_from_object(&obj)?;
        info!(findings = result.total(), "basic analysis complete");
        Ok(result)
    }
}

fn issue_type_for(category: Category) -> IssueType {
    match category {
        Category::WeakKpis => IssueType::WeakKpi,
        Category::ScopeCreep => IssueType::ScopeCreep,
        Category::MissingElements => IssueType::MissingElement,
        Category::RedFlags => IssueType::RedFlag,
        Category::DeliverableIssues => IssueType::DeliverableIssue,
        Category::Inconsistencies => IssueType::Other,
    }
}

/// Fills every category, tolerating missing keys and loosely shaped items.
pub fn result_from_object(obj: &Map<String, Value>) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::default();
    for category in Category::ALL {
        let items = match obj.get(category.key()) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(AnalyzerError::ResponseParse(format!(
                    "`{}` is not a list",
                    category.key()
                )))
            }
        };
        let issue_type = issue_type_for(category);
        result
            .get_mut(category)
            .extend(items.iter().filter_map(|item| coerce_item(item, issue_type)));
    }
    Ok(result)
}

fn coerce_item(item: &Value, issue_type: IssueType) -> Option<Finding> {
    let obj = match item {
        Value::Object(obj) => obj,
        Value::String(s) if !s.trim().is_empty() => {
            return Some(Finding {
                issue_type,
                severity: Level::Medium,
                explanation: String::new(),
                quoted_text: s.clone(),
                location: "Unknown".to_string(),
                matched_example: None,
                remediation: String::new(),
                element: (issue_type == IssueType::MissingElement).then(|| s.clone()),
            });
        }
        _ => return None,
    };

    let first = |keys: &[&str]| keys.iter().find_map(|k| str_field(obj, k)).map(str::to_string);
    let quoted_text = first(&["text", "kpi_text", "flag", "name", "element"]).unwrap_or_default();
    let mut explanation = first(&["issue", "type", "description", "flag"]).unwrap_or_default();
    if explanation.is_empty() {
        if let Some(Value::Array(missing)) = obj.get("missing") {
            let names: Vec<&str> = missing.iter().filter_map(Value::as_str).collect();
            if !names.is_empty() {
                explanation = format!("Missing: {}", names.join(", "));
            }
        }
    }

    Some(Finding {
        issue_type,
        severity: Level::coerce(str_field(obj, "severity"), Level::Medium),
        explanation,
        location: str_field(obj, "location").unwrap_or("Unknown").to_string(),
        matched_example: None,
        remediation: first(&["remediation", "recommendation"]).unwrap_or_default(),
        element: (issue_type == IssueType::MissingElement)
            .then(|| first(&["element", "text"]).unwrap_or_else(|| quoted_text.clone())),
        quoted_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn missing_categories_are_empty() {
        let result = result_from_object(&obj(json!({
            "red_flags": [{"flag": "No kick-off meeting", "severity": "high"}]
        })))
        .unwrap();
        assert_eq!(result.red_flags.len(), 1);
        assert_eq!(result.red_flags[0].severity, Level::High);
        assert_eq!(result.red_flags[0].quoted_text, "No kick-off meeting");
        assert!(result.weak_kpis.is_empty());
        assert_eq!(result.total(), 1);
    }

    #[test]
    fn loose_items_are_coerced() {
        let result = result_from_object(&obj(json!({
            "missing_elements": [{"element": "Acceptance criteria", "severity": "SEVERE"}, "Assumptions"],
            "weak_kpis": [{"text": "Improve outcomes", "missing": ["baseline", "target"]}],
            "inconsistencies": [{"type": "timeline", "issue": "Dates conflict"}]
        })))
        .unwrap();
        assert_eq!(result.missing_elements[0].element.as_deref(), Some("Acceptance criteria"));
        assert_eq!(result.missing_elements[0].severity, Level::Medium);
        assert_eq!(result.missing_elements[1].element.as_deref(), Some("Assumptions"));
        assert_eq!(result.weak_kpis[0].explanation, "Missing: baseline, target");
        assert_eq!(result.inconsistencies[0].explanation, "Dates conflict");
        assert_eq!(result.inconsistencies[0].location, "Unknown");
    }

    #[test]
    fn non_list_category_is_rejected() {
        assert!(result_from_object(&obj(json!({"scope_creep": "lots"}))).is_err());
    }
}
