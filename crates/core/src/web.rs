use crate::models::WebEvidence;
use crate::traits::WebSearch;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_WEB_MAX_RESULTS: usize = 5;

/// Outcome of an augmentation attempt. Failure is data, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebFetch {
    pub evidence: Vec<WebEvidence>,
    pub answer: Option<String>,
    pub error: Option<String>,
}

impl WebFetch {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct WebEvidenceFetcher {
    oracle: Option<Arc<dyn WebSearch>>,
    max_results: usize,
}

impl WebEvidenceFetcher {
    pub fn new(oracle: Arc<dyn WebSearch>) -> Self {
        Self {
            oracle: Some(oracle),
            max_results: DEFAULT_WEB_MAX_RESULTS,
        }
    }

    /// Augmentation turned off; every fetch reports an empty result.
    pub fn disabled() -> Self {
        Self {
            oracle: None,
            max_results: DEFAULT_WEB_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.oracle.is_some()
    }

    /// Single attempt; any oracle retry strategy belongs to the oracle.
    pub async fn fetch(&self, query_text: &str) -> WebFetch {
        let Some(oracle) = &self.oracle else {
            return WebFetch::failed("web search is not configured");
        };

        match oracle.search(query_text, self.max_results).await {
            Ok(results) => {
                info!(result_count = results.results.len(), "web augmentation returned");
                WebFetch {
                    evidence: results.results.into_iter().take(self.max_results).collect(),
                    answer: results.answer,
                    error: None,
                }
            }
            Err(error) => {
                warn!(error = %error, "web augmentation failed, continuing with corpus evidence");
                WebFetch::failed(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::models::WebSearchResults;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOracle {
        calls: AtomicUsize,
        fail: bool,
        results: usize,
    }

    #[async_trait]
    impl WebSearch for CountingOracle {
        async fn search(
            &self,
            query_text: &str,
            _max_results: usize,
        ) -> Result<WebSearchResults, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BackendError::response("tavily", "429 Too Many Requests"));
            }
            Ok(WebSearchResults {
                results: (0..self.results)
                    .map(|index| WebEvidence {
                        title: format!("{query_text} {index}"),
                        url: format!("https://example.test/{index}"),
                        content: "content".to_string(),
                        relevance_score: 0.7,
                        published_date: None,
                    })
                    .collect(),
                answer: Some("summary".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn failure_degrades_to_empty_evidence_without_retry() {
        let oracle = Arc::new(CountingOracle {
            calls: AtomicUsize::new(0),
            fail: true,
            results: 0,
        });
        let fetcher = WebEvidenceFetcher::new(oracle.clone());

        let fetched = fetcher.fetch("miranda").await;
        assert!(fetched.evidence.is_empty());
        assert!(fetched.error.as_deref().unwrap_or_default().contains("429"));
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caps_results() {
        let oracle = Arc::new(CountingOracle {
            calls: AtomicUsize::new(0),
            fail: false,
            results: 8,
        });
        let fetched = WebEvidenceFetcher::new(oracle).with_max_results(3).fetch("miranda").await;

        assert_eq!(fetched.evidence.len(), 3);
        assert_eq!(fetched.answer.as_deref(), Some("summary"));
        assert_eq!(fetched.error, None);
    }

    #[tokio::test]
    async fn disabled_fetcher_reports_empty() {
        let fetched = WebEvidenceFetcher::disabled().fetch("miranda").await;
        assert!(fetched.evidence.is_empty());
        assert!(fetched.error.is_some());
    }
}
