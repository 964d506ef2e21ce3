pub mod cache;
pub mod embeddings;
pub mod error;
pub mod evidence;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod signals;
pub mod stores;
pub mod synthesis;
pub mod traits;
pub mod trigger;
pub mod web;

pub use cache::{
    cache_key, normalize_query, CacheLookup, CacheStats, CacheWrite, MemoryCacheBackend,
    ResponseCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL,
};
pub use embeddings::{
    BgeEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL_DIR,
};
pub use error::{BackendError, CacheError, QueryError};
pub use evidence::{EvidenceFetcher, DEFAULT_MIN_SCORE};
pub use models::{
    CaseEvidence, CaseHit, CaseId, CaseRecord, CitationUsed, Query, SearchMode, SearchResponse,
    SourceKind, SourceSummary, SynthesizedAnswer, TriggerDecision, WebEvidence, WebSearchResults,
};
pub use orchestrator::{
    OrchestratorConfig, PipelineReport, PipelineStage, QueryOrchestrator, QueryOutcome,
};
pub use providers::{ChatCompletionsClient, TavilyClient};
pub use signals::{extract_case_reference, extract_years, normalize_case_name, reference_is_covered};
pub use stores::{JsonCaseStore, QdrantStore};
pub use synthesis::{AnswerSynthesizer, LEGAL_SYSTEM_PROMPT};
pub use traits::{
    AnswerGenerator, CacheBackend, CaseStore, GenerationRequest, SimilaritySearch, WebSearch,
};
pub use trigger::{TriggerConfig, TriggerEvaluator};
pub use web::{WebEvidenceFetcher, WebFetch};
