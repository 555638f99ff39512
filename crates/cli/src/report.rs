use sow_core::models::{AnalysisResult, OverlapResult, SimilarityMatch};
use sow_core::pipeline::{AnalysisMode, DocumentReport};
use std::fmt::Write;

const PREVIEW_CHARS: usize = 80;

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

fn money(v: Option<f64>) -> String {
    v.map(|v| format!("${v:.2}")).unwrap_or_else(|| "unknown".to_string())
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let (high, medium, low) = result.severity_counts();
    let _ = writeln!(
        out,
        "{} findings (HIGH {high}, MEDIUM {medium}, LOW {low})",
        result.total()
    );
    for (category, findings) in result.iter() {
        if findings.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {} ({})", category.key(), findings.len());
        for f in findings {
            let subject = f.element.as_deref().unwrap_or(&f.quoted_text);
            let _ = writeln!(out, "    [{}] {} @ {}", f.severity, preview(subject), f.location);
            if !f.explanation.is_empty() {
                let _ = writeln!(out, "      why: {}", f.explanation);
            }
            if let Some(m) = &f.matched_example {
                let _ = writeln!(
                    out,
                    "      like: {} ({:.2}), {}",
                    m.contract_source, m.similarity_score, m.estimated_cost
                );
            }
            if !f.remediation.is_empty() {
                let _ = writeln!(out, "      fix: {}", f.remediation);
            }
        }
    }
    out
}

pub fn render_document(report: &DocumentReport) -> String {
    let mode = match report.mode {
        AnalysisMode::Retrieval => "retrieval",
        AnalysisMode::Basic => "basic",
    };
    match &report.error {
        Some(e) => format!("{} [{mode}]\nanalysis failed: {e}\n", report.filename),
        None => format!("{} [{mode}]\n{}", report.filename, render_analysis(&report.analysis)),
    }
}

pub fn render_overlap(o: &OverlapResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} vs {}: {:.1}% overlap ({} confidence)",
        o.sow_1_filename, o.sow_2_filename, o.overlap_percentage, o.confidence
    );
    if !o.explanation.is_empty() {
        let _ = writeln!(out, "  {}", o.explanation);
    }
    for area in &o.overlapping_areas {
        let _ = writeln!(out, "  - {area}");
    }
    let _ = writeln!(
        out,
        "  budgets: {} / {}, redundant spend: {}",
        money(o.budget_1),
        money(o.budget_2),
        money(o.redundant_spend)
    );
    if let Some(e) = &o.error {
        let _ = writeln!(out, "  error: {e}");
    }
    out
}

pub fn render_matches(matches: &[SimilarityMatch]) -> String {
    let mut out = String::new();
    for m in matches {
        let _ = writeln!(
            out,
            "{:.3}  {:<18} {}  [{}]",
            m.similarity_score,
            m.pattern.issue_type.as_str(),
            preview(&m.pattern.text),
            m.pattern.contract_source
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sow_core::models::Level;

    #[test]
    fn overlap_lines() {
        let o = OverlapResult {
            sow_1_filename: "a.txt".into(),
            sow_2_filename: "b.txt".into(),
            overlap_percentage: 40.0,
            explanation: "Shared help desk.".into(),
            overlapping_areas: vec!["Help desk".into()],
            confidence: Level::High,
            budget_1: Some(1_000_000.0),
            budget_2: None,
            max_budget: Some(1_000_000.0),
            redundant_spend: Some(400_000.0),
            error: None,
        };
        let text = render_overlap(&o);
        assert!(text.starts_with("a.txt vs b.txt: 40.0% overlap (HIGH confidence)"));
        assert!(text.contains("budgets: $1000000.00 / unknown, redundant spend: $400000.00"));
    }

    #[test]
    fn failed_document_shows_its_error() {
        let report = DocumentReport::failed("b.txt", AnalysisMode::Basic, "model unreachable");
        assert_eq!(render_document(&report), "b.txt [basic]\nanalysis failed: model unreachable\n");
    }

    #[test]
    fn empty_analysis_has_only_summary_line() {
        let text = render_analysis(&AnalysisResult::default());
        assert_eq!(text, "0 findings (HIGH 0, MEDIUM 0, LOW 0)\n");
    }
}
