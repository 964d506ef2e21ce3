use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CaseId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    CorpusOnly,
    #[default]
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::CorpusOnly => "corpus_only",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "corpus_only" | "corpus-only" | "corpus" => Ok(SearchMode::CorpusOnly),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!("unknown search mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub mode: SearchMode,
    pub limit: usize,
}

impl Query {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new(text: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            text: text.into(),
            mode,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("query is empty".to_string());
        }
        if self.limit == 0 {
            return Err("limit must be greater than zero".to_string());
        }
        Ok(())
    }
}

const EMBEDDED_REASONING_CHARS: usize = 2000;

/// A row of the case corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseRecord {
    pub id: CaseId,
    pub case_name: String,
    pub citation: String,
    pub court: String,
    pub year: i32,
    #[serde(default)]
    pub facts: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub holding: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub full_text_url: Option<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

impl CaseRecord {
    /// Text indexed for similarity search.
    /// Labelled case text fed to the document embedder.
    pub fn embedding_text(&self) -> String {
        let reasoning = self
            .reasoning
            .as_deref()
            .map(|text| text.chars().take(EMBEDDED_REASONING_CHARS).collect::<String>());

        let labelled = [
            ("Case", Some(self.case_name.as_str())),
            ("Citation", Some(self.citation.as_str())),
            ("Issue", self.issue.as_deref()),
            ("Holding", self.holding.as_deref()),
            ("Facts", self.facts.as_deref()),
            ("Reasoning", reasoning.as_deref()),
        ];

        labelled
            .into_iter()
            .filter_map(|(label, value)| {
                value
                    .filter(|text| !text.trim().is_empty())
                    .map(|text| format!("{label}: {text}"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A ranked hit from the similarity oracle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CaseHit {
    pub case_id: CaseId,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseEvidence {
    pub case_id: CaseId,
    pub name: String,
    pub citation: String,
    pub court: String,
    pub year: i32,
    pub facts: Option<String>,
    pub holding: Option<String>,
    pub reasoning: Option<String>,
    pub relevance_score: f64,
    pub url: String,
}

impl CaseEvidence {
    pub fn from_record(record: CaseRecord, relevance_score: f64) -> Self {
        Self {
            case_id: record.id,
            name: record.case_name,
            citation: record.citation,
            court: record.court,
            year: record.year,
            facts: record.facts,
            holding: record.holding,
            reasoning: record.reasoning,
            relevance_score,
            url: record.full_text_url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebEvidence {
    pub title: String,
    pub url: String,
    pub content: String,
    pub relevance_score: f64,
    pub published_date: Option<String>,
}

impl WebEvidence {
    pub fn published_year(&self) -> Option<i32> {
        use chrono::Datelike;

        let raw = self.published_date.as_deref()?.trim();
        if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.year());
        }
        if let Ok(parsed) = chrono::DateTime::parse_from_rfc2822(raw) {
            return Some(parsed.year());
        }
        raw.get(..10)
            .and_then(|day| chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .map(|day| day.year())
    }
}

/// Raw web oracle result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebSearchResults {
    pub results: Vec<WebEvidence>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerDecision {
    pub triggered: bool,
    pub reasons: Vec<String>,
}

impl TriggerDecision {
    pub fn skipped() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationUsed {
    pub name: String,
    pub citation: String,
    pub case_id: CaseId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynthesizedAnswer {
    pub text: String,
    pub citations_used: Vec<CitationUsed>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Case,
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSummary {
    pub kind: SourceKind,
    pub name: String,
    pub citation: String,
    pub court: String,
    pub year: i32,
    pub summary: String,
    pub relevance_score: f64,
    pub url: String,
}

/// The externally visible, cacheable result of one query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub answer: String,
    pub sources: Vec<SourceSummary>,
    pub mode: SearchMode,
}
