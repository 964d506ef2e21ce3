use crate::embeddings::Embedder;
use crate::error::BackendError;
use crate::models::{CaseHit, CaseRecord};
use crate::traits::SimilaritySearch;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Similarity oracle over a Qdrant collection whose point ids are case ids.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
    pub status: String,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            embedder,
        }
    }

    /// Runs model inference off the async executor.
    async fn embed_blocking<T, F>(&self, work: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Embedder) -> Result<T, BackendError> + Send + 'static,
    {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || work(embedder.as_ref()))
            .await
            .map_err(|error| BackendError::Embedding(format!("embedding task failed: {error}")))?
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    /// Creates a cosine collection sized to the embedder when it is missing.
    pub async fn ensure_collection(&self) -> Result<(), BackendError> {
        let response = self.client.get(self.collection_url()).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(BackendError::response("qdrant", response.status().to_string()));
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": {
                    "size": self.embedder.dimensions(),
                    "distance": "Cosine"
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::response(
                "qdrant",
                format!("collection setup failed with {}", response.status()),
            ));
        }

        info!(collection = %self.collection, "created qdrant collection");
        Ok(())
    }

    pub async fn upsert_cases(&self, cases: &[CaseRecord]) -> Result<usize, BackendError> {
        let texts: Vec<String> = cases.iter().map(CaseRecord::embedding_text).collect();
        let vectors = self
            .embed_blocking(move |embedder| {
                texts
                    .iter()
                    .map(|text| embedder.embed_document(text))
                    .collect::<Result<Vec<_>, _>>()
            })
            .await?;

        let points: Vec<Value> = cases
            .iter()
            .zip(vectors)
            .map(|(case, vector)| {
                json!({
                    "id": case.id,
                    "vector": vector,
                    "payload": {
                        "case_id": case.id,
                        "case_name": case.case_name,
                        "citation": case.citation,
                        "court": case.court,
                        "year": case.year,
                    },
                })
            })
            .collect();

        if points.is_empty() {
            return Ok(0);
        }

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::response("qdrant", response.status().to_string()));
        }

        Ok(points.len())
    }

    pub async fn collection_info(&self) -> Result<CollectionInfo, BackendError> {
        let response = self.client.get(self.collection_url()).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::response("qdrant", response.status().to_string()));
        }

        let body: Value = response.json().await?;
        Ok(CollectionInfo {
            name: self.collection.clone(),
            points_count: body
                .pointer("/result/points_count")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            status: body
                .pointer("/result/status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        })
    }
}

/// Point id is authoritative; `payload.case_id` is the fallback for string ids.
pub fn parse_search_hits(body: &Value) -> Vec<CaseHit> {
    body.pointer("/result")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let case_id = hit
                        .pointer("/id")
                        .and_then(Value::as_u64)
                        .or_else(|| hit.pointer("/payload/case_id").and_then(Value::as_u64))?;
                    let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
                    Some(CaseHit { case_id, score })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SimilaritySearch for QdrantStore {
    async fn search(
        &self,
        query_text: &str,
        limit: usize,
        score_threshold: f64,
    ) -> Result<Vec<CaseHit>, BackendError> {
        let text = query_text.to_string();
        let query_vector = self
            .embed_blocking(move |embedder| embedder.embed_query(&text))
            .await?;

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": query_vector,
                "limit": limit,
                "score_threshold": score_threshold,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::response("qdrant", response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        let hits = parse_search_hits(&parsed);
        debug!(collection = %self.collection, hit_count = hits.len(), "qdrant search");
        Ok(hits)
    }
}
