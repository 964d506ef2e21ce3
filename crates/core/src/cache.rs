//! Response cache keyed by `(mode, normalized query)`.
//!
//! Backend failures never fail a request: lookups degrade to a miss and
//! writes become no-ops, but both are reported as [`CacheLookup::Degraded`]
//! / [`CacheWrite::Degraded`] so the caller can tell them apart from a
//! plain miss.

use crate::error::CacheError;
use crate::models::{SearchMode, SearchResponse};
use crate::traits::CacheBackend;
use async_trait::async_trait;
use moka::sync::Cache;
use moka::Expiry;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Lowercase and trim surrounding whitespace. Nothing else: internal
/// whitespace and punctuation still distinguish keys.
pub fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn cache_key(text: &str, mode: SearchMode) -> String {
    format!("{}:{}", mode.as_str(), normalize_query(text))
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(SearchResponse),
    Miss,
    Degraded(String),
}

impl CacheLookup {
    pub fn into_hit(self) -> Option<SearchResponse> {
        match self {
            CacheLookup::Hit(response) => Some(response),
            CacheLookup::Miss | CacheLookup::Degraded(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    Stored,
    Degraded(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub default_ttl_secs: u64,
}

#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            default_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn in_memory(capacity: u64) -> Self {
        Self::new(Arc::new(MemoryCacheBackend::with_capacity(capacity)))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn get(&self, query_text: &str, mode: SearchMode) -> CacheLookup {
        let key = cache_key(query_text, mode);
        let raw = match self.backend.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "cache miss");
                return CacheLookup::Miss;
            }
            Err(error) => {
                warn!(key = %key, error = %error, "cache lookup degraded");
                return CacheLookup::Degraded(error.to_string());
            }
        };

        match serde_json::from_str::<SearchResponse>(&raw) {
            Ok(response) => {
                debug!(key = %key, "cache hit");
                CacheLookup::Hit(response)
            }
            Err(error) => {
                let error = CacheError::from(error);
                warn!(key = %key, error = %error, "cached payload unreadable, treating as miss");
                CacheLookup::Degraded(error.to_string())
            }
        }
    }

    pub async fn put(
        &self,
        query_text: &str,
        mode: SearchMode,
        response: &SearchResponse,
        ttl: Option<Duration>,
    ) -> CacheWrite {
        let key = cache_key(query_text, mode);
        let ttl = ttl.unwrap_or(self.default_ttl);

        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(error) => {
                let error = CacheError::from(error);
                warn!(key = %key, error = %error, "cache write skipped");
                return CacheWrite::Degraded(error.to_string());
            }
        };

        match self.backend.set(&key, payload, ttl).await {
            Ok(()) => {
                debug!(key = %key, ttl_secs = ttl.as_secs(), "cached response");
                CacheWrite::Stored
            }
            Err(error) => {
                warn!(key = %key, error = %error, "cache write degraded");
                CacheWrite::Degraded(error.to_string())
            }
        }
    }

    pub async fn invalidate(&self, query_text: &str, mode: SearchMode) -> Result<bool, CacheError> {
        self.backend.delete(&cache_key(query_text, mode)).await
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.backend.clear().await
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats {
            entries: self.backend.len().await?,
            default_ttl_secs: self.default_ttl.as_secs(),
        })
    }

    pub async fn health_check(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "cache health check failed");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CachedPayload {
    body: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CachedPayload> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedPayload,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedPayload,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process backend with bounded capacity and per-entry expiry.
pub struct MemoryCacheBackend {
    entries: Cache<String, CachedPayload>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).map(|payload| payload.body))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CachedPayload { body: value, ttl });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
        Ok(())
    }

    async fn len(&self) -> Result<u64, CacheError> {
        self.entries.run_pending_tasks();
        Ok(self.entries.entry_count())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceKind, SourceSummary};

    struct UnreachableBackend;

    #[async_trait]
    impl CacheBackend for UnreachableBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn clear(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn len(&self) -> Result<u64, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
    }

    fn sample_response() -> SearchResponse {
        SearchResponse {
            answer: "Miranda v. Arizona requires warnings.".to_string(),
            sources: vec![SourceSummary {
                kind: SourceKind::Case,
                name: "Miranda v. Arizona".to_string(),
                citation: "384 U.S. 436".to_string(),
                court: "Supreme Court".to_string(),
                year: 1966,
                summary: "Warnings required.".to_string(),
                relevance_score: 0.92,
                url: String::new(),
            }],
            mode: SearchMode::Hybrid,
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_query("  Miranda RIGHTS \n");
        assert_eq!(once, "miranda rights");
        assert_eq!(normalize_query(&once), once);
    }

    #[test]
    fn key_keeps_internal_whitespace_and_punctuation() {
        assert_eq!(cache_key("Miranda Rights", SearchMode::Hybrid), "hybrid:miranda rights");
        assert_ne!(
            cache_key("miranda  rights", SearchMode::Hybrid),
            cache_key("miranda rights", SearchMode::Hybrid)
        );
        assert_ne!(
            cache_key("miranda rights?", SearchMode::Hybrid),
            cache_key("miranda rights", SearchMode::Hybrid)
        );
    }

    #[tokio::test]
    async fn lookup_is_case_and_surrounding_whitespace_insensitive() {
        let cache = ResponseCache::in_memory(100);
        let response = sample_response();

        assert_eq!(
            cache.put("miranda rights", SearchMode::Hybrid, &response, None).await,
            CacheWrite::Stored
        );
        assert_eq!(
            cache.get("  Miranda Rights ", SearchMode::Hybrid).await,
            CacheLookup::Hit(response)
        );
    }

    #[tokio::test]
    async fn modes_do_not_share_entries() {
        let cache = ResponseCache::in_memory(100);
        cache
            .put("miranda rights", SearchMode::Hybrid, &sample_response(), None)
            .await;

        assert_eq!(
            cache.get("miranda rights", SearchMode::CorpusOnly).await,
            CacheLookup::Miss
        );
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::in_memory(100);
        let response = sample_response();
        cache
            .put(
                "miranda rights",
                SearchMode::Hybrid,
                &response,
                Some(Duration::from_millis(100)),
            )
            .await;

        assert_eq!(
            cache.get("miranda rights", SearchMode::Hybrid).await,
            CacheLookup::Hit(response)
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(
            cache.get("miranda rights", SearchMode::Hybrid).await,
            CacheLookup::Miss
        );
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_instead_of_failing() {
        let cache = ResponseCache::new(Arc::new(UnreachableBackend));

        assert!(matches!(
            cache.get("miranda rights", SearchMode::Hybrid).await,
            CacheLookup::Degraded(_)
        ));
        assert!(matches!(
            cache
                .put("miranda rights", SearchMode::Hybrid, &sample_response(), None)
                .await,
            CacheWrite::Degraded(_)
        ));
        assert!(!cache.health_check().await);
        assert!(cache.stats().await.is_err());
    }

    #[tokio::test]
    async fn unreadable_payload_is_reported_as_degraded() {
        let backend = Arc::new(MemoryCacheBackend::new());
        backend
            .set("hybrid:miranda rights", "not json".to_string(), DEFAULT_CACHE_TTL)
            .await
            .unwrap();
        let cache = ResponseCache::new(backend);

        let lookup = cache.get("miranda rights", SearchMode::Hybrid).await;
        assert!(matches!(lookup, CacheLookup::Degraded(_)));
        assert_eq!(lookup.into_hit(), None);
    }

    #[tokio::test]
    async fn administrative_operations_remove_entries() {
        let cache = ResponseCache::in_memory(100);
        let response = sample_response();
        cache.put("first", SearchMode::Hybrid, &response, None).await;
        cache.put("second", SearchMode::CorpusOnly, &response, None).await;
        assert_eq!(cache.stats().await.unwrap().entries, 2);

        assert!(cache.invalidate("FIRST", SearchMode::Hybrid).await.unwrap());
        assert!(!cache.invalidate("first", SearchMode::Hybrid).await.unwrap());
        assert_eq!(cache.get("first", SearchMode::Hybrid).await, CacheLookup::Miss);

        cache.clear().await.unwrap();
        assert_eq!(cache.stats().await.unwrap().entries, 0);
        assert!(cache.health_check().await);
    }
}
