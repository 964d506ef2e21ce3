//! HTTP surface over the query orchestrator.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use caselaw_core::{
    BackendError, CacheError, CaseId, CaseRecord, CaseStore, Query, QueryError,
    QueryOrchestrator, SearchMode, SearchResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, instrument};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: QueryOrchestrator,
    pub corpus: Arc<dyn CaseStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/search", post(search_handler))
        .route("/api/v1/cases/{id}", get(case_handler))
        .route("/api/v1/cache", delete(clear_cache_handler))
        .route("/api/v1/cache/stats", get(cache_stats_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("case {0} not found")]
    CaseNotFound(CaseId),

    #[error("corpus lookup failed: {0}")]
    Corpus(#[from] BackendError),

    #[error("cache operation failed: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Query(query_error) if query_error.is_client_error() => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Query(query_error) if query_error.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::CaseNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Query(_) | ApiError::Corpus(_) | ApiError::Cache(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    Query::DEFAULT_LIMIT
}

#[instrument(skip_all)]
pub async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = Query::new(request.query, request.mode).with_limit(request.limit);
    let response = state.orchestrator.answer(&query).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CaseDetail {
    pub id: CaseId,
    pub name: String,
    pub citation: String,
    pub court: String,
    pub year: i32,
    pub facts: Option<String>,
    pub issue: Option<String>,
    pub holding: Option<String>,
    pub reasoning: Option<String>,
    pub full_text_url: String,
}

impl From<CaseRecord> for CaseDetail {
    fn from(record: CaseRecord) -> Self {
        Self {
            id: record.id,
            name: record.case_name,
            citation: record.citation,
            court: record.court,
            year: record.year,
            facts: record.facts,
            issue: record.issue,
            holding: record.holding,
            reasoning: record.reasoning,
            full_text_url: record.full_text_url.unwrap_or_default(),
        }
    }
}

#[instrument(skip_all, fields(case_id = id))]
pub async fn case_handler(
    State(state): State<AppState>,
    Path(id): Path<CaseId>,
) -> Result<Json<CaseDetail>, ApiError> {
    let record = state
        .corpus
        .get_case(id)
        .await?
        .ok_or(ApiError::CaseNotFound(id))?;
    Ok(Json(CaseDetail::from(record)))
}

pub async fn clear_cache_handler(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.orchestrator.cache().clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cache_stats_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let stats = state.orchestrator.cache().stats().await?;
    Ok(Json(stats).into_response())
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: &'static str,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = if state.orchestrator.cache().health_check().await {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: "healthy",
        cache,
    })
}
