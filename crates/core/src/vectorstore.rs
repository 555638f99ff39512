//! Vector store backends behind the pattern index.
//!
//! Similarity is derived from cosine similarity `c` as `(1 + c) / 2`, i.e. one minus
//! the cosine distance normalized to [0, 1]. Ties keep insertion order.

use crate::error::{AnalyzerError, Result};
use crate::models::{IssueType, Level, PatternEntry, SimilarityMatch};
use providers::qdrant::{QdrantClient, QdrantPoint};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use storage::models::{NewPattern, PatternRow};
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    fn backend(&self) -> &'static str;
    /// Discards current contents and stores `entries` in order.
    async fn replace_all(&self, entries: Vec<PatternEntry>) -> Result<()>;
    /// Up to `k` matches, best first.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityMatch>>;
    async fn count(&self) -> Result<usize>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub fn similarity_from_cosine(cosine: f32) -> f32 {
    ((1.0 + cosine) / 2.0).clamp(0.0, 1.0)
}

/// Brute-force ranking over insertion-ordered entries. The sort is stable, so equal
/// scores keep their insertion order.
fn rank(entries: &[Arc<PatternEntry>], vector: &[f32], k: usize) -> Vec<SimilarityMatch> {
    let mut scored: Vec<SimilarityMatch> = entries
        .iter()
        .map(|entry| SimilarityMatch {
            pattern: Arc::clone(entry),
            similarity_score: similarity_from_cosine(cosine_similarity(&entry.embedding, vector)),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    scored
}

/// Process-local store. Useful for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<Arc<PatternEntry>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn replace_all(&self, entries: Vec<PatternEntry>) -> Result<()> {
        let fresh: Vec<Arc<PatternEntry>> = entries.into_iter().map(Arc::new).collect();
        *self.entries.write().await = fresh;
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityMatch>> {
        let entries = self.entries.read().await;
        Ok(rank(&entries, vector, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// Durable store over the SQLite `patterns` table; rows are cached after first read.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    cache: RwLock<Option<Vec<Arc<PatternEntry>>>>,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(None),
        }
    }

    async fn loaded(&self) -> Result<Vec<Arc<PatternEntry>>> {
        if let Some(entries) = self.cache.read().await.as_ref() {
            return Ok(entries.clone());
        }
        let mut cache = self.cache.write().await;
        if let Some(entries) = cache.as_ref() {
            return Ok(entries.clone());
        }
        let rows = storage::patterns::load_all(&self.pool)
            .await
            .map_err(store_err)?;
        let entries = rows
            .into_iter()
            .map(|row| row_to_entry(row).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = entries.len(), "pattern rows loaded from sqlite");
        *cache = Some(entries.clone());
        Ok(entries)
    }
}

fn store_err(e: anyhow::Error) -> AnalyzerError {
    AnalyzerError::Store(e.to_string())
}

fn row_to_entry(row: PatternRow) -> Result<PatternEntry> {
    let embedding = row.embedding()?;
    Ok(PatternEntry {
        id: row.id,
        text: row.text,
        issue_type: IssueType::coerce(Some(&row.issue_type)),
        severity: Level::coerce(Some(&row.severity), Level::Medium),
        explanation: row.explanation,
        actual_outcome: row.actual_outcome,
        estimated_cost: row.estimated_cost,
        correct_version: row.correct_version,
        contract_source: row.contract_source,
        embedding,
    })
}

fn entry_to_row(entry: &PatternEntry) -> NewPattern {
    NewPattern {
        id: entry.id.clone(),
        text: entry.text.clone(),
        issue_type: entry.issue_type.as_str().to_string(),
        severity: entry.severity.as_str().to_string(),
        explanation: entry.explanation.clone(),
        actual_outcome: entry.actual_outcome.clone(),
        estimated_cost: entry.estimated_cost.clone(),
        correct_version: entry.correct_version.clone(),
        contract_source: entry.contract_source.clone(),
        embedding: entry.embedding.clone(),
    }
}

#[async_trait::async_trait]
impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn replace_all(&self, entries: Vec<PatternEntry>) -> Result<()> {
        let rows: Vec<NewPattern> = entries.iter().map(entry_to_row).collect();
        let mut cache = self.cache.write().await;
        // Drop the cache first so a failed write never leaves stale rows visible.
        *cache = None;
        storage::patterns::replace_all(&self.pool, &rows)
            .await
            .map_err(store_err)?;
        *cache = Some(entries.into_iter().map(Arc::new).collect());
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityMatch>> {
        let entries = self.loaded().await?;
        Ok(rank(&entries, vector, k))
    }

    async fn count(&self) -> Result<usize> {
        if let Some(entries) = self.cache.read().await.as_ref() {
            return Ok(entries.len());
        }
        storage::patterns::count(&self.pool).await.map_err(store_err)
    }
}

/// Hits fetched beyond `k` before the insertion-order tie-break.
const TIE_MARGIN: usize = 8;

/// Remote store. Rebuilds drop and recreate the collection, so a failure midway
/// leaves it partially filled until the next successful rebuild.
pub struct QdrantStore {
    client: QdrantClient,
}

impl QdrantStore {
    pub fn new(client: QdrantClient) -> Self {
        Self { client }
    }
}

fn entry_payload(entry: &PatternEntry, ordinal: u64) -> HashMap<String, serde_json::Value> {
    let mut payload = HashMap::new();
    payload.insert("ordinal".to_string(), serde_json::json!(ordinal));
    payload.insert("id".to_string(), serde_json::json!(entry.id));
    payload.insert("text".to_string(), serde_json::json!(entry.text));
    payload.insert("issue_type".to_string(), serde_json::json!(entry.issue_type.as_str()));
    payload.insert("severity".to_string(), serde_json::json!(entry.severity.as_str()));
    payload.insert("explanation".to_string(), serde_json::json!(entry.explanation));
    payload.insert("actual_outcome".to_string(), serde_json::json!(entry.actual_outcome));
    payload.insert("estimated_cost".to_string(), serde_json::json!(entry.estimated_cost));
    payload.insert("correct_version".to_string(), serde_json::json!(entry.correct_version));
    payload.insert("contract_source".to_string(), serde_json::json!(entry.contract_source));
    payload
}

fn payload_to_entry(payload: &serde_json::Value) -> (u64, PatternEntry) {
    let s = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let ordinal = payload
        .get("ordinal")
        .and_then(|v| v.as_u64())
        .unwrap_or(u64::MAX);
    let entry = PatternEntry {
        id: s("id"),
        text: s("text"),
        issue_type: IssueType::coerce(payload.get("issue_type").and_then(|v| v.as_str())),
        severity: Level::coerce(payload.get("severity").and_then(|v| v.as_str()), Level::Medium),
        explanation: s("explanation"),
        actual_outcome: s("actual_outcome"),
        estimated_cost: s("estimated_cost"),
        correct_version: s("correct_version"),
        contract_source: s("contract_source"),
        embedding: Vec::new(),
    };
    (ordinal, entry)
}

#[async_trait::async_trait]
impl VectorStore for QdrantStore {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn replace_all(&self, entries: Vec<PatternEntry>) -> Result<()> {
        let dim = entries.first().map(|e| e.embedding.len()).unwrap_or_default();
        self.client.recreate_collection(dim).await?;
        let points: Vec<QdrantPoint> = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| QdrantPoint {
                id: i as u64,
                payload: entry_payload(&entry, i as u64),
                vector: entry.embedding,
            })
            .collect();
        if !points.is_empty() {
            self.client.upsert(points).await?;
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityMatch>> {
        // Extra hits let ties at the k boundary resolve by insertion order.
        let limit = k.saturating_add(TIE_MARGIN) as u64;
        let resp = self.client.search(vector.to_vec(), limit, None).await?;
        let mut hits: Vec<(u64, SimilarityMatch)> = resp
            .result
            .iter()
            .map(|r| {
                let (ordinal, entry) = r
                    .payload
                    .as_ref()
                    .map(payload_to_entry)
                    .unwrap_or_else(|| payload_to_entry(&serde_json::Value::Null));
                (
                    ordinal,
                    SimilarityMatch {
                        pattern: Arc::new(entry),
                        similarity_score: similarity_from_cosine(r.score),
                    },
                )
            })
            .collect();
        hits.sort_by(|(oa, a), (ob, b)| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(oa.cmp(ob))
        });
        Ok(hits.into_iter().map(|(_, m)| m).take(k).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.client.count().await? as usize)
    }
}
