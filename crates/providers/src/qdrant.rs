use crate::openai::ensure_success;
use crate::ProviderError;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub api_key: Option<String>,
}

#[derive(Clone)]
pub struct QdrantClient {
    client: Client,
    cfg: QdrantConfig,
}

impl QdrantClient {
    pub fn new(cfg: QdrantConfig) -> Self {
        Self {
            client: Client::new(),
            cfg,
        }
    }

    pub fn collection(&self) -> &str {
        &self.cfg.collection
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.cfg.url.trim_end_matches('/'),
            self.cfg.collection,
            suffix
        )
    }

    fn authed(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some(key) = &self.cfg.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let resp = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        ensure_success(resp).await
    }

    /// Drops the collection if present and creates it again with cosine distance.
    pub async fn recreate_collection(&self, vector_size: usize) -> Result<(), ProviderError> {
        let resp = self
            .authed(self.client.delete(self.collection_url("")))
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        // 404 just means there was nothing to drop.
        if resp.status().as_u16() != 404 {
            ensure_success(resp).await?;
        }

        #[derive(Serialize)]
        struct VectorParams {
            size: usize,
            distance: &'static str,
        }
        #[derive(Serialize)]
        struct CreateCollection {
            vectors: VectorParams,
        }
        let body = CreateCollection {
            vectors: VectorParams {
                size: vector_size,
                distance: "Cosine",
            },
        };
        self.send(self.client.put(self.collection_url("")).json(&body))
            .await?;
        Ok(())
    }

    pub async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<serde_json::Value>,
    ) -> Result<QdrantSearchResponse, ProviderError> {
        #[derive(Serialize)]
        struct SearchRequest {
            vector: Vec<f32>,
            limit: u64,
            with_payload: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<serde_json::Value>,
        }
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
            filter,
        };
        let resp = self
            .send(
                self.client
                    .post(self.collection_url("/points/search"))
                    .json(&body),
            )
            .await?;
        resp.json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }

    pub async fn upsert(&self, points: Vec<QdrantPoint>) -> Result<(), ProviderError> {
        let req = QdrantUpsert { points };
        self.send(
            self.client
                .put(self.collection_url("/points?wait=true"))
                .json(&req),
        )
        .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, ProviderError> {
        #[derive(Deserialize)]
        struct CountResult {
            count: u64,
        }
        #[derive(Deserialize)]
        struct CountResponse {
            result: CountResult,
        }
        let resp = self
            .authed(
                self.client
                    .post(self.collection_url("/points/count"))
                    .json(&serde_json::json!({ "exact": true })),
            )
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        // Missing collection reads as empty.
        if resp.status().as_u16() == 404 {
            return Ok(0);
        }
        let parsed: CountResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(parsed.result.count)
    }
}

#[derive(Debug, Serialize)]
pub struct QdrantUpsert {
    pub points: Vec<QdrantPoint>,
}

#[derive(Debug, Serialize)]
pub struct QdrantPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct QdrantSearchResponse {
    pub result: Vec<SearchResult>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SearchResult {
    pub id: serde_json::Value,
    pub score: f32,
    pub payload: Option<serde_json::Value>,
}
