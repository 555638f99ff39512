//! Retrieval-validation: chunk, retrieve similar known-bad excerpts, ask the judge.

use crate::aggregator;
use crate::chunker::chunk_text;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::index::PatternIndex;
use crate::models::{AnalysisResult, Chunk, Finding, IssueType, Level, MatchedExample, SimilarityMatch};
use crate::prompts;
use crate::response::{parse_object, str_field, bool_field};
use futures::stream::{self, StreamExt, TryStreamExt};
use providers::retry::{call_with_retry, RetryPolicy};
use providers::{CompletionRequest, LlmProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RetrievalEngine {
    index: Arc<PatternIndex>,
    llm: Arc<dyn LlmProvider>,
    cfg: AnalysisConfig,
    policy: RetryPolicy,
}

impl RetrievalEngine {
    pub fn new(index: Arc<PatternIndex>, llm: Arc<dyn LlmProvider>, cfg: AnalysisConfig) -> Self {
        let policy = cfg.retry_policy();
        Self {
            index,
            llm,
            cfg,
            policy,
        }
    }

    /// Analyzes one document with the configured `top_k` and chunk size.
    pub async fn analyze(&self, document_text: &str, document_id: &str) -> Result<AnalysisResult> {
        self.analyze_with(document_text, document_id, self.cfg.top_k, self.cfg.chunk_size)
            .await
    }

    /// Index errors abort the run so the caller can degrade; judge failures only
    /// drop the affected chunk.
    pub async fn analyze_with(
        &self,
        document_text: &str,
        document_id: &str,
        top_k: usize,
        chunk_size: usize,
    ) -> Result<AnalysisResult> {
        let chunks = chunk_text(document_text, chunk_size, document_id);
        info!(document = document_id, chunks = chunks.len(), "retrieval analysis started");

        let findings: Vec<Option<Finding>> = stream::iter(chunks)
            .map(|chunk| self.evaluate_chunk(chunk, top_k))
            .buffered(self.cfg.concurrency.max(1))
            .try_collect()
            .await?;

        let findings: Vec<Finding> = findings.into_iter().flatten().collect();
        info!(document = document_id, findings = findings.len(), "retrieval analysis complete");
        Ok(aggregator::group(findings))
    }

    async fn evaluate_chunk(&self, chunk: Chunk, top_k: usize) -> Result<Option<Finding>> {
        if chunk.text.trim().chars().count() < self.cfg.min_chunk_chars {
            debug!(chunk = chunk.ordinal, "chunk too short, skipped");
            return Ok(None);
        }

        let matches = self.index.query(&chunk.text, top_k).await?;
        let Some(best) = matches.first() else {
            debug!(chunk = chunk.ordinal, "no similar patterns");
            return Ok(None);
        };

        let req = CompletionRequest::deterministic(
            prompts::validation(&chunk.text, &matches),
            self.cfg.max_tokens,
        );
        let resp = match call_with_retry(&self.policy, || self.llm.complete(&req)).await {
            Ok(r) => r,
            Err(e) => {
                warn!(chunk = chunk.ordinal, error = %e, "judge call failed");
                return Ok(None);
            }
        };
        let verdict = match parse_object(&resp.text) {
            Ok(v) => v,
            Err(e) => {
                warn!(chunk = chunk.ordinal, error = %e, "judge verdict unreadable");
                return Ok(None);
            }
        };

        if !bool_field(&verdict, "has_issue") {
            return Ok(None);
        }
        debug!(chunk = chunk.ordinal, "judge flagged chunk");
        Ok(Some(finding_from_verdict(&verdict, best)))
    }
}

fn finding_from_verdict(
    verdict: &serde_json::Map<String, serde_json::Value>,
    best: &SimilarityMatch,
) -> Finding {
    let issue_type = IssueType::coerce(str_field(verdict, "issue_type"));
    let quoted_text = str_field(verdict, "problematic_text").unwrap_or_default().to_string();
    let element = (issue_type == IssueType::MissingElement).then(|| {
        if quoted_text.is_empty() {
            "Missing element".to_string()
        } else {
            quoted_text.clone()
        }
    });
    Finding {
        issue_type,
        severity: Level::coerce(str_field(verdict, "severity"), Level::Medium),
        explanation: str_field(verdict, "explanation").unwrap_or_default().to_string(),
        quoted_text,
        location: str_field(verdict, "location").unwrap_or("Unknown").to_string(),
        matched_example: Some(MatchedExample::from(best)),
        remediation: str_field(verdict, "remediation").unwrap_or_default().to_string(),
        element,
    }
}
