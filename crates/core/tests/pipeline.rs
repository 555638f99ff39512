mod common;

use common::{curated_examples, judged_section, memory_index, BagOfWords, ScriptedLlm, SCOPE_PARAGRAPH};
use providers::{ProviderError, ProviderRegistry};
use sow_core::config::AppConfig;
use sow_core::document::SourceDocument;
use sow_core::models::Category;
use sow_core::pipeline::{
    build_analyzer_with, build_overlap_estimator, build_vector_store, AnalysisMode, Analyzer, ReportSummary,
};
use sow_core::AnalyzerError;
use sow_core::vectorstore::VectorStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Answers all three prompt kinds.
fn responder(prompt: &str) -> Result<String, ProviderError> {
    if let Some(section) = judged_section(prompt) {
        if section.contains("full range") {
            return Ok(r#"{"has_issue": true, "issue_type": "scope_creep", "severity": "HIGH", "problematic_text": "full range of support"}"#.to_string());
        }
        return Ok(r#"{"has_issue": false}"#.to_string());
    }
    if prompt.contains("<SOW_1_TEXT>") {
        return Ok(r#"{"overlap_percentage": 25, "explanation": "some", "overlapping_areas": ["support"], "confidence": "MEDIUM"}"#.to_string());
    }
    Ok(r#"{"red_flags": [{"flag": "No final report", "severity": "HIGH"}], "missing_elements": [{"element": "Acceptance criteria"}]}"#.to_string())
}

#[tokio::test]
async fn unavailable_index_goes_straight_to_basic_analysis() {
    let embedder = Arc::new(BagOfWords::default());
    let (index, _) = memory_index(embedder.clone());
    let llm = Arc::new(ScriptedLlm::new(responder));
    let analyzer = Analyzer::new(index, llm.clone(), &AppConfig::default());

    let report = analyzer
        .analyze_document(&SourceDocument::from_text("sow.txt", SCOPE_PARAGRAPH))
        .await
        .unwrap();

    assert_eq!(report.mode, AnalysisMode::Basic);
    assert_eq!(llm.judge_calls(), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.analysis.red_flags.len(), 1);
    assert_eq!(
        report.analysis.missing_elements[0].element.as_deref(),
        Some("Acceptance criteria")
    );

    let json = serde_json::to_value(&report.analysis).unwrap();
    for c in Category::ALL {
        assert!(json[c.key()].is_array(), "missing {}", c.key());
    }
}

#[tokio::test]
async fn available_index_uses_retrieval() {
    let (index, _) = memory_index(Arc::new(BagOfWords::default()));
    index.rebuild(&curated_examples()).await.unwrap();
    let llm = Arc::new(ScriptedLlm::new(responder));
    let analyzer = Analyzer::new(index, llm.clone(), &AppConfig::default());

    let report = analyzer
        .analyze_document(&SourceDocument::from_text("sow.txt", SCOPE_PARAGRAPH))
        .await
        .unwrap();

    assert_eq!(report.mode, AnalysisMode::Retrieval);
    assert_eq!(llm.judge_calls(), 1);
    assert_eq!(report.analysis.scope_creep.len(), 1);
}

#[tokio::test]
async fn retrieval_error_falls_back_to_basic() {
    let embedder = Arc::new(BagOfWords::default());
    let (index, _) = memory_index(embedder.clone());
    index.rebuild(&curated_examples()).await.unwrap();
    embedder.fail.store(true, Ordering::SeqCst);

    let llm = Arc::new(ScriptedLlm::new(responder));
    let analyzer = Analyzer::new(index, llm.clone(), &AppConfig::default());
    let report = analyzer
        .analyze_document(&SourceDocument::from_text("sow.txt", SCOPE_PARAGRAPH))
        .await
        .unwrap();

    assert_eq!(report.mode, AnalysisMode::Basic);
    assert_eq!(llm.judge_calls(), 0);
    assert_eq!(report.analysis.red_flags.len(), 1);
}

#[tokio::test]
async fn basic_analysis_failure_is_reported() {
    let (index, _) = memory_index(Arc::new(BagOfWords::default()));
    let llm = Arc::new(ScriptedLlm::new(|_: &str| Ok("no json at all".to_string())));
    let analyzer = Analyzer::new(index, llm, &AppConfig::default());

    let err = analyzer
        .analyze_document(&SourceDocument::from_text("sow.txt", SCOPE_PARAGRAPH))
        .await
        .unwrap_err();
    assert!(matches!(err, sow_core::AnalyzerError::ResponseParse(_)));
}

#[tokio::test]
async fn batch_reports_documents_in_order_with_overlap() {
    let (index, _) = memory_index(Arc::new(BagOfWords::default()));
    index.rebuild(&curated_examples()).await.unwrap();
    let analyzer = Analyzer::new(index, Arc::new(ScriptedLlm::new(responder)), &AppConfig::default());

    let docs = vec![
        SourceDocument::from_text("b.txt", format!("{SCOPE_PARAGRAPH}. Contract value: $200,000")),
        SourceDocument::from_text("a.txt", "Short."),
    ];
    let report = analyzer.analyze_batch(&docs, false).await;

    let names: Vec<&str> = report.documents.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(names, ["b.txt", "a.txt"]);
    assert_eq!(
        report.documents[0].summary,
        ReportSummary {
            total_findings: 1,
            high: 1,
            medium: 0,
            low: 0
        }
    );
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["documents"][0]["summary"]["total_findings"], 1);
    assert!(json["documents"][0].get("error").is_none());
    let overlap = report.overlap.unwrap();
    assert_eq!(overlap.overlap_percentage, 25.0);
    assert_eq!(overlap.redundant_spend, Some(50_000.0));

    let single = analyzer.analyze_batch(&docs[..1], true).await;
    assert!(single.overlap.is_none());
    assert_eq!(single.documents[0].mode, AnalysisMode::Basic);
}

#[tokio::test]
async fn failed_document_does_not_sink_the_batch() {
    let (index, _) = memory_index(Arc::new(BagOfWords::default()));
    let llm = Arc::new(ScriptedLlm::new(|prompt: &str| {
        if !prompt.contains("<SOW_1_TEXT>") && prompt.contains("unreadable scan") {
            return Ok("garbage".to_string());
        }
        responder(prompt)
    }));
    let analyzer = Analyzer::new(index, llm, &AppConfig::default());

    let docs = vec![
        SourceDocument::from_text("good.txt", "Deliver a final report. Contract value: $200,000"),
        SourceDocument::from_text("bad.txt", "unreadable scan"),
    ];
    let report = analyzer.analyze_batch(&docs, true).await;

    assert_eq!(report.documents.len(), 2);
    assert!(report.documents[0].error.is_none());
    assert_eq!(report.documents[0].analysis.red_flags.len(), 1);
    assert_eq!(report.documents[0].summary.total_findings, 2);

    let failed = &report.documents[1];
    assert_eq!(failed.filename, "bad.txt");
    assert!(failed.error.as_deref().unwrap().contains("could not parse model response"));
    assert_eq!(failed.analysis.total(), 0);
    assert_eq!(failed.summary, ReportSummary::default());

    let overlap = report.overlap.unwrap();
    assert_eq!(overlap.overlap_percentage, 25.0);
    assert!(overlap.error.is_none());
}

#[tokio::test]
async fn missing_embedding_provider_degrades_to_basic() {
    let mut cfg = AppConfig::default();
    cfg.index.backend = "memory".into();
    cfg.embeddings.provider = "openai".into();
    cfg.llm.provider = "scripted".into();
    let llm = Arc::new(ScriptedLlm::new(responder));
    let registry = ProviderRegistry::new()
        .with_llm("scripted", llm.clone())
        .set_preferred_embedding("openai")
        .set_preferred_llm("scripted");

    let analyzer = build_analyzer_with(&cfg, &registry).await.unwrap();
    assert!(!analyzer.index().is_available().await);
    assert!(analyzer.index().query("full range of support", 3).await.unwrap().is_empty());
    let err = analyzer.index().rebuild(&curated_examples()).await.unwrap_err();
    assert!(matches!(err, AnalyzerError::IndexBuild(_)));

    let report = analyzer
        .analyze_document(&SourceDocument::from_text("sow.txt", SCOPE_PARAGRAPH))
        .await
        .unwrap();
    assert_eq!(report.mode, AnalysisMode::Basic);
    assert_eq!(llm.judge_calls(), 0);
}

#[tokio::test]
async fn overlap_estimator_needs_no_index() {
    let mut cfg = AppConfig::default();
    cfg.llm.provider = "noop".into();
    cfg.index.backend = "qdrant".into();
    cfg.index.url = None;

    let estimator = build_overlap_estimator(&cfg).unwrap();
    let a = SourceDocument::from_text("a.txt", "Help desk support.");
    let b = SourceDocument::from_text("b.txt", "Service desk support.");
    let result = estimator.estimate_overlap(&a, &b).await;
    assert_eq!(result.overlap_percentage, 0.0);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn vector_store_backend_selection() {
    let mut cfg = AppConfig::default();
    cfg.index.backend = "memory".into();
    assert_eq!(build_vector_store(&cfg, None).unwrap().backend(), "memory");

    cfg.index.backend = "sqlite".into();
    assert!(build_vector_store(&cfg, None).is_err());

    cfg.index.backend = "qdrant".into();
    assert!(build_vector_store(&cfg, None).is_err());
    cfg.index.url = Some("http://localhost:6333".into());
    assert_eq!(build_vector_store(&cfg, None).unwrap().backend(), "qdrant");

    cfg.index.backend = "chroma".into();
    assert!(build_vector_store(&cfg, None).is_err());
}
