//! Pairwise redundancy estimate between two SOWs, reconciled with their budgets.

use crate::config::OverlapConfig;
use crate::document::SourceDocument;
use crate::error::{AnalyzerError, Result};
use crate::models::{Confidence, Level, OverlapResult};
use crate::prompts;
use crate::response::{normalize_quotes, number_field, parse_object, str_field};
use providers::retry::{call_with_retry, RetryPolicy};
use providers::{CompletionRequest, LlmProvider};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Monetary phrases in priority order. The first pattern with a parseable
/// amount wins.
const BUDGET_PATTERNS: [&str; 6] = [
    r"(?i)contract\s+value[:\s]+\$?([\d,]+(?:\.\d{2})?)",
    r"(?i)total\s+contract\s+value[:\s]+\$?([\d,]+(?:\.\d{2})?)",
    r"(?i)not\s+to\s+exceed[:\s]+\$?([\d,]+(?:\.\d{2})?)",
    r"(?i)maximum\s+contract\s+value[:\s]+\$?([\d,]+(?:\.\d{2})?)",
    r"(?i)total\s+obligated\s+amount[:\s]+\$?([\d,]+(?:\.\d{2})?)",
    r"(?i)ceiling\s+price[:\s]+\$?([\d,]+(?:\.\d{2})?)",
];

fn budget_regexes() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        BUDGET_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// First contract amount stated in `text`, or `None` if no known phrase carries one.
pub fn extract_budget(text: &str) -> Option<f64> {
    for re in budget_regexes() {
        for caps in re.captures_iter(text) {
            let Some(amount) = caps.get(1) else { continue };
            if let Ok(v) = amount.as_str().replace(',', "").parse::<f64>() {
                return Some(v);
            }
        }
    }
    None
}

/// Larger of the two budgets, or whichever one is known.
pub fn max_budget(budget_1: Option<f64>, budget_2: Option<f64>) -> Option<f64> {
    match (budget_1, budget_2) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

pub fn redundant_spend(max_budget: Option<f64>, overlap_percentage: f64) -> Option<f64> {
    max_budget.map(|b| b * overlap_percentage / 100.0)
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub struct OverlapEstimator {
    llm: Arc<dyn LlmProvider>,
    cfg: OverlapConfig,
    policy: RetryPolicy,
}

impl OverlapEstimator {
    pub fn new(llm: Arc<dyn LlmProvider>, cfg: OverlapConfig, policy: RetryPolicy) -> Self {
        Self { llm, cfg, policy }
    }

    /// Never fails: model or parse errors come back as a 0% LOW-confidence result
    /// with `error` set.
    pub async fn estimate_overlap(&self, doc_a: &SourceDocument, doc_b: &SourceDocument) -> OverlapResult {
        let text_a = doc_a.full_text();
        let text_b = doc_b.full_text();
        match self.ask_model(&doc_a.filename, &text_a, &doc_b.filename, &text_b).await {
            Ok(reply) => {
                let budget_1 = extract_budget(&text_a);
                let budget_2 = extract_budget(&text_b);
                let max = max_budget(budget_1, budget_2);
                info!(
                    overlap = reply.percentage,
                    a = %doc_a.filename,
                    b = %doc_b.filename,
                    "overlap estimate complete"
                );
                OverlapResult {
                    sow_1_filename: doc_a.filename.clone(),
                    sow_2_filename: doc_b.filename.clone(),
                    overlap_percentage: reply.percentage,
                    explanation: reply.explanation,
                    overlapping_areas: reply.areas,
                    confidence: reply.confidence,
                    budget_1,
                    budget_2,
                    max_budget: max,
                    redundant_spend: redundant_spend(max, reply.percentage),
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "overlap estimate failed");
                OverlapResult {
                    sow_1_filename: doc_a.filename.clone(),
                    sow_2_filename: doc_b.filename.clone(),
                    overlap_percentage: 0.0,
                    explanation: format!("Error during overlap analysis: {e}"),
                    overlapping_areas: Vec::new(),
                    confidence: Level::Low,
                    budget_1: None,
                    budget_2: None,
                    max_budget: None,
                    redundant_spend: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Compares the first two documents only; `None` for fewer than two.
    pub async fn estimate_batch(&self, docs: &[SourceDocument]) -> Option<OverlapResult> {
        match docs {
            [a, b, ..] => Some(self.estimate_overlap(a, b).await),
            _ => None,
        }
    }

    async fn ask_model(&self, name_a: &str, text_a: &str, name_b: &str, text_b: &str) -> Result<OverlapReply> {
        let prompt = prompts::overlap(
            name_a,
            truncate_chars(text_a, self.cfg.truncate_chars),
            name_b,
            truncate_chars(text_b, self.cfg.truncate_chars),
        );
        let req = CompletionRequest::deterministic(prompt, self.cfg.max_tokens);
        let resp = call_with_retry(&self.policy, || self.llm.complete(&req)).await?;
        let obj = parse_object(&normalize_quotes(&resp.text))?;

        let percentage = number_field(&obj, "overlap_percentage").ok_or_else(|| {
            AnalyzerError::ResponseParse("overlap_percentage missing or not a number".into())
        })?;
        let areas = match obj.get("overlapping_areas") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        Ok(OverlapReply {
            percentage: percentage.clamp(0.0, 100.0),
            explanation: str_field(&obj, "explanation").unwrap_or_default().to_string(),
            areas,
            confidence: Confidence::coerce(str_field(&obj, "confidence"), Level::Low),
        })
    }
}

struct OverlapReply {
    percentage: f64,
    explanation: String,
    areas: Vec<String>,
    confidence: Confidence,
}
