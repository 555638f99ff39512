#![allow(dead_code)]

use providers::retry::RetryPolicy;
use providers::{
    CompletionRequest, CompletionResponse, EmbedResponse, EmbeddingProvider, LlmProvider,
    ProviderError,
};
use sow_core::embeddings::Embedder;
use sow_core::index::PatternIndex;
use sow_core::models::RawExample;
use sow_core::vectorstore::{InMemoryVectorStore, VectorStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIMS: usize = 64;

/// Deterministic bag-of-words embedder: each lowercased word bumps one bucket.
#[derive(Default)]
pub struct BagOfWords {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl BagOfWords {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIMS];
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            let bucket = word.bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % DIMS] += 1.0;
        }
        v
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for BagOfWords {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                status: 400,
                body: "embedding rejected".into(),
            });
        }
        Ok(EmbedResponse {
            vectors: texts.iter().map(|t| Self::vector(t)).collect(),
        })
    }
}

type Responder = dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync;

/// LLM stub answering from a closure over the prompt; records every prompt.
pub struct ScriptedLlm {
    responder: Box<Responder>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responder: impl Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts sent for chunk validation.
    pub fn judge_calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains("<uploaded_sow_section>"))
            .count()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        assert_eq!(req.temperature, 0.0);
        self.prompts.lock().unwrap().push(req.prompt.clone());
        (self.responder)(&req.prompt).map(|text| CompletionResponse { text, model: None })
    }
}

/// Section text embedded in a validation prompt.
pub fn judged_section(prompt: &str) -> Option<&str> {
    let start = prompt.find("<uploaded_sow_section>\n")? + "<uploaded_sow_section>\n".len();
    let end = prompt.find("\n</uploaded_sow_section>")?;
    prompt.get(start..end)
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::none(Duration::from_secs(5))
}

pub fn example(id: &str, text: &str, issue_type: &str) -> RawExample {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "problematic_section": text,
        "issue_type": issue_type,
        "severity": "HIGH",
        "explanation": "open ended commitment",
        "actual_outcome": "cost overrun",
        "estimated_cost": "$4.2M",
        "correct_version": "bounded by task order",
        "contract_source": "GAO-19-000"
    }))
    .unwrap()
}

pub fn curated_examples() -> Vec<RawExample> {
    vec![
        example(
            "ex-scope",
            "contractor shall provide the full range of support that may be required from time to time",
            "scope_creep",
        ),
        example(
            "ex-kpi",
            "contractor shall improve customer satisfaction and enhance outcomes",
            "weak_kpi",
        ),
        example(
            "ex-missing",
            "no acceptance criteria are defined for any deliverable",
            "missing_element",
        ),
    ]
}

pub fn memory_index(embedder: Arc<BagOfWords>) -> (Arc<PatternIndex>, Arc<dyn VectorStore>) {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let index = PatternIndex::new(
        Embedder::new(embedder, 8, fast_policy()),
        store.clone(),
        "test_patterns",
    );
    (Arc::new(index), store)
}

/// Twenty words each, long enough to pass the minimum chunk length.
pub const SCOPE_PARAGRAPH: &str = "The contractor shall provide the full range of support that may be required from time to time by the agency";
pub const BOUNDED_PARAGRAPH: &str = "The contractor shall deliver monthly status reports within 10 business days of each reporting period end per Section 5.2 requirements";
