//! Pattern index: known-bad contract excerpts searchable by embedding similarity.
//!
//! Rebuilds are exclusive. A read/write gate keeps queries out while the store is
//! being swapped, and every embedding is computed before the store is touched, so a
//! provider failure leaves the previous contents in place.

use crate::embeddings::Embedder;
use crate::error::{AnalyzerError, Result};
use crate::models::{PatternEntry, RawExample, SimilarityMatch};
use crate::vectorstore::VectorStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ExampleFile {
    #[serde(default)]
    examples: Vec<RawExample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_examples: usize,
    pub collection_name: String,
    pub backend: String,
}

/// Without an embedder the index is permanently unavailable: queries come back
/// empty and rebuilds fail.
pub struct PatternIndex {
    embedder: Option<Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    gate: RwLock<()>,
}

impl PatternIndex {
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self::with_embedder(Some(embedder), store, collection)
    }

    pub fn with_embedder(
        embedder: Option<Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            gate: RwLock::new(()),
        }
    }

    /// Reads the curated example collection (`{"examples": [...]}`).
    pub fn load_examples(path: &Path) -> Result<Vec<RawExample>> {
        if !path.exists() {
            return Err(AnalyzerError::IndexBuild(format!(
                "example collection not found: {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        let file: ExampleFile = serde_json::from_str(&raw).map_err(|e| {
            AnalyzerError::IndexBuild(format!("invalid example collection {}: {e}", path.display()))
        })?;
        Ok(file.examples)
    }

    pub async fn rebuild_from_file(&self, path: &Path) -> Result<usize> {
        let examples = Self::load_examples(path)?;
        self.rebuild(&examples).await
    }

    /// Replaces the whole index with `examples`. Returns the number stored.
    pub async fn rebuild(&self, examples: &[RawExample]) -> Result<usize> {
        if examples.is_empty() {
            return Err(AnalyzerError::IndexBuild("no examples to index".into()));
        }
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| AnalyzerError::IndexBuild("no embedding provider configured".into()))?;

        // Ids key the durable store; content-hash ids collide for identical excerpts.
        let mut seen = HashSet::with_capacity(examples.len());
        for example in examples {
            let id = example.resolved_id();
            if !seen.insert(id.clone()) {
                return Err(AnalyzerError::IndexBuild(format!(
                    "duplicate example id `{id}`, index unchanged"
                )));
            }
        }
        info!(count = examples.len(), "embedding curated examples");

        let texts: Vec<String> = examples
            .iter()
            .map(|e| e.problematic_section.clone())
            .collect();
        let vectors = embedder
            .embed_all(&texts)
            .await
            .map_err(|e| AnalyzerError::IndexBuild(format!("embedding failed, index unchanged: {e}")))?;

        let entries: Vec<PatternEntry> = examples
            .iter()
            .zip(vectors)
            .map(|(example, vector)| PatternEntry::from_example(example, vector))
            .collect();
        let count = entries.len();

        let _exclusive = self.gate.write().await;
        self.store.replace_all(entries).await.map_err(|e| {
            AnalyzerError::IndexBuild(format!(
                "{} store write failed, rebuild required before querying: {e}",
                self.store.backend()
            ))
        })?;
        info!(count, backend = self.store.backend(), "pattern index rebuilt");
        Ok(count)
    }

    /// Top `k` matches for `text`, best first. Empty when the index has never been
    /// built or the text is blank.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SimilarityMatch>> {
        let Some(embedder) = self.embedder.as_ref() else {
            return Ok(Vec::new());
        };
        if k == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let _shared = self.gate.read().await;
        if self.store.count().await? == 0 {
            debug!("pattern index empty, no matches");
            return Ok(Vec::new());
        }
        let vector = embedder.embed_one(text).await?;
        self.store.search(&vector, k).await
    }

    /// True when an embedder is configured and the backend holds at least one pattern.
    pub async fn is_available(&self) -> bool {
        if self.embedder.is_none() {
            return false;
        }
        let _shared = self.gate.read().await;
        match self.store.count().await {
            Ok(n) => n > 0,
            Err(e) => {
                warn!(error = %e, "pattern index backend unreachable");
                false
            }
        }
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        let _shared = self.gate.read().await;
        Ok(IndexStats {
            total_examples: self.store.count().await?,
            collection_name: self.collection.clone(),
            backend: self.store.backend().to_string(),
        })
    }
}
