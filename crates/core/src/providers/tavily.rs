use crate::error::BackendError;
use crate::models::{WebEvidence, WebSearchResults};
use crate::traits::WebSearch;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

pub const LEGAL_DOMAINS: &[&str] = &[
    "courtlistener.com",
    "justia.com",
    "law.cornell.edu",
    "supremecourt.gov",
    "oyez.org",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    Advanced,
    Basic,
}

impl SearchDepth {
    fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Advanced => "advanced",
            SearchDepth::Basic => "basic",
        }
    }
}

/// Web oracle backed by Tavily. An advanced-depth failure steps down to a
/// single basic-depth retry.
pub struct TavilyClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    include_domains: Vec<String>,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_endpoint(TAVILY_SEARCH_URL, api_key)
    }

    pub fn with_endpoint(endpoint: &str, api_key: impl Into<String>) -> Result<Self, BackendError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BackendError::NotConfigured("web search api key is empty".to_string()));
        }

        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            endpoint: Url::parse(endpoint)?,
            api_key,
            include_domains: LEGAL_DOMAINS.iter().map(|domain| domain.to_string()).collect(),
        })
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.include_domains = domains;
        self
    }

    async fn search_at_depth(
        &self,
        query_text: &str,
        max_results: usize,
        depth: SearchDepth,
    ) -> Result<WebSearchResults, BackendError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({
                "api_key": self.api_key,
                "query": query_text,
                "max_results": max_results,
                "search_depth": depth.as_str(),
                "include_domains": self.include_domains,
                "include_answer": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::response("tavily", response.status().to_string()));
        }

        let body: Value = response.json().await?;
        Ok(parse_results(&body))
    }
}

pub fn parse_results(body: &Value) -> WebSearchResults {
    let results = body
        .pointer("/results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| WebEvidence {
                    title: text_field(item, "/title"),
                    url: text_field(item, "/url"),
                    content: text_field(item, "/content"),
                    relevance_score: item.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                    published_date: item
                        .pointer("/published_date")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    WebSearchResults {
        results,
        answer: body
            .pointer("/answer")
            .and_then(Value::as_str)
            .filter(|answer| !answer.trim().is_empty())
            .map(str::to_string),
    }
}

fn text_field(item: &Value, pointer: &str) -> String {
    item.pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(
        &self,
        query_text: &str,
        max_results: usize,
    ) -> Result<WebSearchResults, BackendError> {
        match self
            .search_at_depth(query_text, max_results, SearchDepth::Advanced)
            .await
        {
            Ok(results) => Ok(results),
            Err(error) => {
                warn!(error = %error, "advanced web search failed, retrying at basic depth");
                self.search_at_depth(query_text, max_results, SearchDepth::Basic)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results_and_answer() {
        let body = json!({
            "query": "miranda",
            "answer": "Miranda warnings are required before custodial interrogation.",
            "results": [
                {
                    "title": "Miranda v. Arizona | Oyez",
                    "url": "https://www.oyez.org/cases/1965/759",
                    "content": "The Court held...",
                    "score": 0.93,
                    "published_date": "2023-01-02"
                },
                { "title": "Untitled", "url": "https://example.test" }
            ]
        });

        let parsed = parse_results(&body);
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].relevance_score, 0.93);
        assert_eq!(parsed.results[0].published_date.as_deref(), Some("2023-01-02"));
        assert_eq!(parsed.results[1].content, "");
        assert_eq!(parsed.results[1].relevance_score, 0.0);
        assert!(parsed.answer.is_some());
    }

    #[test]
    fn blank_answer_is_dropped() {
        let parsed = parse_results(&json!({ "answer": "  ", "results": [] }));
        assert_eq!(parsed, WebSearchResults::default());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            TavilyClient::new(" "),
            Err(BackendError::NotConfigured(_))
        ));
    }
}
