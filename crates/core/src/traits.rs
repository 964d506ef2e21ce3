use crate::error::{BackendError, CacheError};
use crate::models::{CaseHit, CaseId, CaseRecord, WebSearchResults};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn get_case(&self, id: CaseId) -> Result<Option<CaseRecord>, BackendError>;
}

#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Ranked hits, descending score, none below `score_threshold`.
    async fn search(
        &self,
        query_text: &str,
        limit: usize,
        score_threshold: f64,
    ) -> Result<Vec<CaseHit>, BackendError>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(
        &self,
        query_text: &str,
        max_results: usize,
    ) -> Result<WebSearchResults, BackendError>;
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub system_prompt: &'a str,
    pub context: &'a str,
    pub query: &'a str,
    pub temperature: f32,
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, BackendError>;
}

/// Key/value store with per-entry expiry. Single-key operations are atomic.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    async fn len(&self) -> Result<u64, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}
