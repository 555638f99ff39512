//! Wires providers, the pattern index and the analyzers, and runs the
//! degraded-mode policy: retrieval when the index is usable, basic analysis otherwise.

use crate::basic::BasicRiskAnalyzer;
use crate::config::AppConfig;
use crate::document::SourceDocument;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::PatternIndex;
use crate::models::{AnalysisResult, OverlapResult};
use crate::overlap::OverlapEstimator;
use crate::retrieval::RetrievalEngine;
use crate::vectorstore::{InMemoryVectorStore, QdrantStore, SqliteVectorStore, VectorStore};
use anyhow::Context;
use chrono::{DateTime, Utc};
use providers::anthropic::{AnthropicConfig, AnthropicProvider};
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::qdrant::{QdrantClient, QdrantConfig};
use providers::{LlmProvider, ProviderRegistry};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use storage::{connect, migrate};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Retrieval,
    Basic,
}

/// Finding counts for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_findings: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ReportSummary {
    pub fn of(analysis: &AnalysisResult) -> Self {
        let (high, medium, low) = analysis.severity_counts();
        Self {
            total_findings: analysis.total(),
            high,
            medium,
            low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub filename: String,
    pub mode: AnalysisMode,
    pub summary: ReportSummary,
    pub analysis: AnalysisResult,
    /// Set when the document could not be analyzed; `analysis` is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    pub fn new(filename: impl Into<String>, mode: AnalysisMode, analysis: AnalysisResult) -> Self {
        Self {
            filename: filename.into(),
            mode,
            summary: ReportSummary::of(&analysis),
            analysis,
            error: None,
        }
    }

    pub fn failed(filename: impl Into<String>, mode: AnalysisMode, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(filename, mode, AnalysisResult::default())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub documents: Vec<DocumentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<OverlapResult>,
}

pub struct Analyzer {
    index: Arc<PatternIndex>,
    retrieval: RetrievalEngine,
    basic: BasicRiskAnalyzer,
    overlap: OverlapEstimator,
}

impl Analyzer {
    pub fn new(index: Arc<PatternIndex>, llm: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        let policy = config.analysis.retry_policy();
        Self {
            retrieval: RetrievalEngine::new(index.clone(), llm.clone(), config.analysis.clone()),
            basic: BasicRiskAnalyzer::new(llm.clone(), config.analysis.basic_max_tokens, policy.clone()),
            overlap: OverlapEstimator::new(llm, config.overlap.clone(), policy),
            index,
        }
    }

    pub fn index(&self) -> &Arc<PatternIndex> {
        &self.index
    }

    /// Retrieval analysis, falling back to the basic analyzer when the index is
    /// unavailable or the retrieval path errors.
    pub async fn analyze_document(&self, doc: &SourceDocument) -> Result<DocumentReport> {
        if !self.index.is_available().await {
            warn!(file = %doc.filename, "pattern index unavailable, using basic analysis");
            return self.analyze_basic(doc).await;
        }
        match self.retrieval.analyze(&doc.full_text(), &doc.filename).await {
            Ok(analysis) => Ok(DocumentReport::new(&doc.filename, AnalysisMode::Retrieval, analysis)),
            Err(e) => {
                warn!(file = %doc.filename, error = %e, "retrieval analysis failed, using basic analysis");
                self.analyze_basic(doc).await
            }
        }
    }

    pub async fn analyze_basic(&self, doc: &SourceDocument) -> Result<DocumentReport> {
        let analysis = self.basic.analyze_basic(&doc.structured()).await?;
        Ok(DocumentReport::new(&doc.filename, AnalysisMode::Basic, analysis))
    }

    /// Documents in input order, then the overlap of the first two. A document
    /// that fails is reported with its error and the batch carries on.
    pub async fn analyze_batch(&self, docs: &[SourceDocument], force_basic: bool) -> BatchReport {
        let mut documents = Vec::with_capacity(docs.len());
        for doc in docs {
            info!(file = %doc.filename, "analyzing document");
            let outcome = if force_basic {
                self.analyze_basic(doc).await
            } else {
                self.analyze_document(doc).await
            };
            let report = outcome.unwrap_or_else(|e| {
                warn!(file = %doc.filename, error = %e, "document analysis failed");
                // Only basic analysis errors escape analyze_document.
                DocumentReport::failed(&doc.filename, AnalysisMode::Basic, e.to_string())
            });
            documents.push(report);
        }
        let overlap = self.overlap.estimate_batch(docs).await;
        BatchReport {
            generated_at: Utc::now(),
            documents,
            overlap,
        }
    }
}

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new()
        .with_embedding("noop", Arc::new(NoopProvider))
        .with_llm("noop", Arc::new(NoopProvider));

    if let Some(key) = std::env::var_os("OPENAI_API_KEY") {
        let base = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com".to_string());
        let chat_model = if config.llm.provider == "openai" {
            config.llm.model.clone()
        } else {
            "gpt-4o-mini".to_string()
        };
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base,
            embedding_model: config.embeddings.model.clone(),
            chat_model,
        });
        reg = reg
            .with_embedding("openai", Arc::new(provider.clone()))
            .with_llm("openai", Arc::new(provider));
    }

    if let Some(key) = std::env::var_os("ANTHROPIC_API_KEY") {
        let provider = AnthropicProvider::new(AnthropicConfig::new(
            key.to_string_lossy().into_owned(),
            config.llm.model.clone(),
        ));
        reg = reg.with_llm("anthropic", Arc::new(provider));
    }

    reg.set_preferred_embedding(&config.embeddings.provider)
        .set_preferred_llm(&config.llm.provider)
}

/// Store for `config.index.backend`. The SQLite backend needs `pool`.
pub fn build_vector_store(config: &AppConfig, pool: Option<SqlitePool>) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.index.backend.as_str() {
        "qdrant" => {
            let url = config
                .index
                .url
                .clone()
                .context("index.url is required for the qdrant backend")?;
            let client = QdrantClient::new(QdrantConfig {
                url,
                collection: config.index.collection.clone(),
                api_key: std::env::var("QDRANT_API_KEY").ok(),
            });
            Ok(Arc::new(QdrantStore::new(client)))
        }
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        "sqlite" => {
            let pool = pool.context("sqlite backend requires a database pool")?;
            Ok(Arc::new(SqliteVectorStore::new(pool)))
        }
        other => anyhow::bail!("unknown index backend `{other}`"),
    }
}

/// Opens the database (when the backend needs one) and builds the pattern index.
pub async fn open_index(config: &AppConfig, registry: &ProviderRegistry) -> anyhow::Result<Arc<PatternIndex>> {
    let pool = if config.index.backend == "sqlite" {
        let pool = connect(&config.database.path).await.context("db connect")?;
        migrate(&pool).await.context("db migrate")?;
        Some(pool)
    } else {
        None
    };
    let store = build_vector_store(config, pool)?;
    let embedder = match Embedder::from_registry(
        registry,
        None,
        config.embeddings.batch_size,
        config.analysis.retry_policy(),
    ) {
        Ok(embedder) => Some(embedder),
        Err(e) => {
            warn!(
                provider = %config.embeddings.provider,
                error = %e,
                "no embedding provider, pattern index unavailable"
            );
            None
        }
    };
    Ok(Arc::new(PatternIndex::with_embedder(
        embedder,
        store,
        config.index.collection.clone(),
    )))
}

/// Overlap estimation needs only the completion provider.
pub fn build_overlap_estimator(config: &AppConfig) -> anyhow::Result<OverlapEstimator> {
    let registry = build_registry(config);
    let llm = registry.llm(None).context("llm provider")?;
    Ok(OverlapEstimator::new(
        llm,
        config.overlap.clone(),
        config.analysis.retry_policy(),
    ))
}

/// Index plus analyzers, ready to run.
pub async fn build_analyzer(config: &AppConfig) -> anyhow::Result<Analyzer> {
    let registry = build_registry(config);
    build_analyzer_with(config, &registry).await
}

pub async fn build_analyzer_with(config: &AppConfig, registry: &ProviderRegistry) -> anyhow::Result<Analyzer> {
    let index = open_index(config, registry).await?;
    let llm = registry.llm(None).context("llm provider")?;
    Ok(Analyzer::new(index, llm, config))
}
