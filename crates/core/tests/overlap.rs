mod common;

use common::{fast_policy, ScriptedLlm};
use providers::ProviderError;
use sow_core::config::OverlapConfig;
use sow_core::document::SourceDocument;
use sow_core::models::Level;
use sow_core::overlap::OverlapEstimator;
use std::sync::Arc;

fn docs() -> Vec<SourceDocument> {
    vec![
        SourceDocument::from_text(
            "help_desk_a.txt",
            "Tier 1 help desk support for agency staff. Total Contract Value: $1,000,000.00",
        ),
        SourceDocument::from_text(
            "help_desk_b.txt",
            "Service desk and tier 1 support. Not to exceed $1,500,000",
        ),
        SourceDocument::from_text("unrelated.txt", "Road resurfacing. Ceiling price: $9,000,000"),
    ]
}

fn estimator(llm: Arc<ScriptedLlm>) -> OverlapEstimator {
    OverlapEstimator::new(llm, OverlapConfig::default(), fast_policy())
}

#[tokio::test]
async fn redundant_spend_uses_larger_budget() {
    let llm = Arc::new(ScriptedLlm::new(|_: &str| {
        Ok("Here you go: {\u{201C}overlap_percentage\u{201D}: 40, \"explanation\": \"Both fund tier 1 support.\", \
            \"overlapping_areas\": [\"Help desk\", \"Ticket triage\"], \"confidence\": \"high\"}"
            .to_string())
    }));
    let docs = docs();
    let result = estimator(llm.clone()).estimate_overlap(&docs[0], &docs[1]).await;

    assert_eq!(result.overlap_percentage, 40.0);
    assert_eq!(result.budget_1, Some(1_000_000.0));
    assert_eq!(result.budget_2, Some(1_500_000.0));
    assert_eq!(result.max_budget, Some(1_500_000.0));
    assert_eq!(result.redundant_spend, Some(600_000.0));
    assert_eq!(result.confidence, Level::High);
    assert_eq!(result.overlapping_areas, ["Help desk", "Ticket triage"]);
    assert!(result.error.is_none());

    let prompt = llm.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Filename: help_desk_a.txt"));
    assert!(prompt.contains("Filename: help_desk_b.txt"));
}

#[tokio::test]
async fn model_failure_is_a_zero_overlap_result() {
    let llm = Arc::new(ScriptedLlm::new(|_: &str| {
        Err(ProviderError::Status {
            status: 401,
            body: "invalid key".into(),
        })
    }));
    let docs = docs();
    let result = estimator(llm).estimate_overlap(&docs[0], &docs[1]).await;

    assert_eq!(result.overlap_percentage, 0.0);
    assert_eq!(result.confidence, Level::Low);
    assert!(result.explanation.starts_with("Error during overlap analysis"));
    assert!(result.error.is_some());
    assert!(result.redundant_spend.is_none());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["confidence"], "LOW");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn unparseable_reply_is_recovered() {
    let llm = Arc::new(ScriptedLlm::new(|_: &str| Ok("they overlap a lot".to_string())));
    let docs = docs();
    let result = estimator(llm).estimate_overlap(&docs[0], &docs[1]).await;
    assert_eq!(result.overlap_percentage, 0.0);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn nan_percentage_keeps_result_numeric() {
    let llm = Arc::new(ScriptedLlm::new(|_: &str| {
        Ok(r#"{"overlap_percentage": "NaN", "explanation": "unsure", "confidence": "HIGH"}"#.to_string())
    }));
    let docs = docs();
    let result = estimator(llm).estimate_overlap(&docs[0], &docs[1]).await;

    assert_eq!(result.overlap_percentage, 0.0);
    assert!(result.error.is_some());
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["overlap_percentage"].is_number());
}

#[tokio::test]
async fn batch_compares_first_two_only() {
    let llm = Arc::new(ScriptedLlm::new(|_: &str| {
        Ok(r#"{"overlap_percentage": 10, "explanation": "little", "overlapping_areas": [], "confidence": "MEDIUM"}"#.to_string())
    }));
    let est = estimator(llm.clone());
    let docs = docs();

    let result = est.estimate_batch(&docs).await.unwrap();
    assert_eq!(result.sow_1_filename, "help_desk_a.txt");
    assert_eq!(result.sow_2_filename, "help_desk_b.txt");
    assert_eq!(llm.calls(), 1);

    assert!(est.estimate_batch(&docs[..1]).await.is_none());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn long_documents_are_truncated_for_the_model() {
    let llm = Arc::new(ScriptedLlm::new(|_: &str| {
        Ok(r#"{"overlap_percentage": 5, "explanation": "", "overlapping_areas": [], "confidence": "LOW"}"#.to_string())
    }));
    let cfg = OverlapConfig {
        truncate_chars: 20,
        ..OverlapConfig::default()
    };
    let est = OverlapEstimator::new(llm.clone(), cfg, fast_policy());
    let long = format!("{} Ceiling price: $2,000", "x".repeat(100));
    let a = SourceDocument::from_text("a.txt", long.clone());
    let b = SourceDocument::from_text("b.txt", long);

    let result = est.estimate_overlap(&a, &b).await;
    let prompt = llm.prompts.lock().unwrap()[0].clone();
    assert!(!prompt.contains("Ceiling price"));
    assert_eq!(result.budget_1, Some(2_000.0));
}
