use crate::error::{AnalyzerError, Result};
use providers::retry::{call_with_retry, RetryPolicy};
use providers::{EmbeddingProvider, ProviderRegistry};
use std::sync::Arc;

/// Batched, retried text-to-vector conversion over one provider.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    policy: RetryPolicy,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, policy: RetryPolicy) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            policy,
        }
    }

    pub fn from_registry(
        registry: &ProviderRegistry,
        name: Option<&str>,
        batch_size: usize,
        policy: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self::new(registry.embedding(name)?, batch_size, policy))
    }

    /// One vector per input, in input order.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let resp =
                call_with_retry(&self.policy, || self.provider.embed(batch)).await?;
            if resp.vectors.len() != batch.len() {
                return Err(AnalyzerError::Embedding(format!(
                    "embedding provider returned {} vectors for {} inputs",
                    resp.vectors.len(),
                    batch.len()
                )));
            }
            vectors.extend(resp.vectors);
        }
        Ok(vectors)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_all(&[text.to_string()]).await?;
        out.pop()
            .ok_or_else(|| AnalyzerError::Embedding("embedding provider returned nothing".into()))
    }
}
