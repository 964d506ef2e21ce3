use crate::cache::{CacheLookup, CacheWrite, ResponseCache, DEFAULT_CACHE_TTL};
use crate::error::QueryError;
use crate::evidence::{EvidenceFetcher, DEFAULT_MIN_SCORE};
use crate::models::{
    CaseEvidence, CitationUsed, Query, SearchMode, SearchResponse, SourceKind, SourceSummary,
    TriggerDecision, WebEvidence,
};
use crate::synthesis::{truncate_chars, AnswerSynthesizer, DEFAULT_TEMPERATURE};
use crate::trigger::{TriggerConfig, TriggerEvaluator};
use crate::web::{WebEvidenceFetcher, WebFetch, DEFAULT_WEB_MAX_RESULTS};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

const SUMMARY_LIMIT: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    pub min_score: f64,
    pub trigger: TriggerConfig,
    pub web_max_results: usize,
    pub temperature: f32,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            trigger: TriggerConfig::default(),
            web_max_results: DEFAULT_WEB_MAX_RESULTS,
            temperature: DEFAULT_TEMPERATURE,
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: Duration::from_secs(90),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    CacheCheck,
    EvidenceFetch,
    TriggerEval,
    WebFetch,
    Synthesize,
    Respond,
}

/// What the pipeline decided for one query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineReport {
    pub request_id: Uuid,
    pub cache_hit: bool,
    pub cache_degraded: bool,
    pub trigger: Option<TriggerDecision>,
    pub web_error: Option<String>,
    pub web_answer: Option<String>,
    pub citations_used: Vec<CitationUsed>,
    pub stages: Vec<PipelineStage>,
}

impl PipelineReport {
    fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            cache_hit: false,
            cache_degraded: false,
            trigger: None,
            web_error: None,
            web_answer: None,
            citations_used: Vec::new(),
            stages: Vec::new(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        self.stages.push(stage);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub response: SearchResponse,
    pub report: PipelineReport,
}

/// Sequences cache, evidence, trigger, web, and synthesis for one query.
/// Holds only shared read-mostly handles; safe to share across requests.
#[derive(Clone)]
pub struct QueryOrchestrator {
    cache: ResponseCache,
    evidence: EvidenceFetcher,
    trigger: TriggerEvaluator,
    web: WebEvidenceFetcher,
    synthesizer: AnswerSynthesizer,
    config: OrchestratorConfig,
}

impl QueryOrchestrator {
    pub fn new(
        cache: ResponseCache,
        evidence: EvidenceFetcher,
        web: WebEvidenceFetcher,
        synthesizer: AnswerSynthesizer,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            cache: cache.with_default_ttl(config.cache_ttl),
            evidence: evidence.with_min_score(config.min_score),
            trigger: TriggerEvaluator::new(config.trigger),
            web: web.with_max_results(config.web_max_results),
            synthesizer: synthesizer.with_temperature(config.temperature),
            config,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn answer(&self, query: &Query) -> Result<SearchResponse, QueryError> {
        self.run(query).await.map(|outcome| outcome.response)
    }

    pub async fn run(&self, query: &Query) -> Result<QueryOutcome, QueryError> {
        query.validate().map_err(QueryError::InvalidQuery)?;

        let request_id = Uuid::new_v4();
        let span = info_span!("query", request_id = %request_id, mode = %query.mode);
        let timeout = self.config.request_timeout;

        let pipeline = self.pipeline(query, request_id).instrument(span);
        match tokio::time::timeout(timeout, pipeline).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    request_id = %request_id,
                    timeout_secs = timeout.as_secs(),
                    "query timed out"
                );
                Err(QueryError::Timeout(timeout))
            }
        }
    }

    async fn pipeline(&self, query: &Query, request_id: Uuid) -> Result<QueryOutcome, QueryError> {
        let mut report = PipelineReport::new(request_id);

        report.enter(PipelineStage::CacheCheck);
        match self.cache.get(&query.text, query.mode).await {
            CacheLookup::Hit(response) => {
                info!("serving cached response");
                report.cache_hit = true;
                return Ok(QueryOutcome { response, report });
            }
            CacheLookup::Miss => {}
            CacheLookup::Degraded(_) => report.cache_degraded = true,
        }

        report.enter(PipelineStage::EvidenceFetch);
        let cases = self
            .evidence
            .fetch(&query.text, query.limit)
            .await
            .map_err(QueryError::Retrieval)?;
        info!(case_count = cases.len(), "corpus evidence fetched");

        let mut web = WebFetch::default();
        if query.mode == SearchMode::Hybrid {
            report.enter(PipelineStage::TriggerEval);
            let decision = self.trigger.evaluate(query.mode, &query.text, &cases);
            info!(
                triggered = decision.triggered,
                reasons = ?decision.reasons,
                "augmentation decision"
            );

            if decision.triggered {
                report.enter(PipelineStage::WebFetch);
                web = self.web.fetch(&query.text).await;
            }
            report.trigger = Some(decision);
        }
        report.web_error = web.error.clone();
        report.web_answer = web.answer.clone();

        if cases.is_empty() && web.evidence.is_empty() {
            info!("no relevant evidence");
            return Err(QueryError::NoEvidence);
        }

        report.enter(PipelineStage::Synthesize);
        let answer = self
            .synthesizer
            .synthesize(&query.text, &cases, &web.evidence)
            .await
            .map_err(QueryError::Synthesis)?;

        report.enter(PipelineStage::Respond);
        report.citations_used = answer.citations_used;
        let response = SearchResponse {
            answer: answer.text,
            sources: compose_sources(&cases, &web.evidence),
            mode: query.mode,
        };

        let write = self
            .cache
            .put(&query.text, query.mode, &response, None)
            .await;
        if let CacheWrite::Degraded(_) = write {
            report.cache_degraded = true;
        }

        Ok(QueryOutcome { response, report })
    }
}

pub fn case_summary(case: &CaseEvidence) -> String {
    if let Some(holding) = case.holding.as_deref().filter(|text| !text.trim().is_empty()) {
        return holding.to_string();
    }
    case.facts
        .as_deref()
        .map(|facts| truncate_chars(facts, SUMMARY_LIMIT))
        .unwrap_or_default()
}

/// Case sources in oracle order, then web sources.
pub fn compose_sources(cases: &[CaseEvidence], web: &[WebEvidence]) -> Vec<SourceSummary> {
    let case_sources = cases.iter().map(|case| SourceSummary {
        kind: SourceKind::Case,
        name: case.name.clone(),
        citation: case.citation.clone(),
        court: case.court.clone(),
        year: case.year,
        summary: case_summary(case),
        relevance_score: case.relevance_score,
        url: case.url.clone(),
    });

    let web_sources = web.iter().map(|source| SourceSummary {
        kind: SourceKind::Web,
        name: source.title.clone(),
        citation: String::new(),
        court: "web".to_string(),
        year: source.published_year().unwrap_or(0),
        summary: truncate_chars(&source.content, SUMMARY_LIMIT),
        relevance_score: source.relevance_score,
        url: source.url.clone(),
    });

    case_sources.chain(web_sources).collect()
}
