use caselaw_core::providers::{DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use caselaw_core::{
    AnswerSynthesizer, BgeEmbedder, ChatCompletionsClient, EvidenceFetcher, JsonCaseStore,
    OrchestratorConfig, QdrantStore, QueryOrchestrator, ResponseCache, SearchMode, TavilyClient,
    WebEvidenceFetcher, DEFAULT_EMBEDDING_MODEL_DIR,
};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Parser)]
#[command(name = "caselaw", version, about = "Case-law question answering over a curated corpus")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub backends: BackendArgs,
}

#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// JSON file holding the case corpus
    #[arg(long, env = "CASELAW_CORPUS_PATH", default_value = "data/cases.json", global = true)]
    pub corpus_path: PathBuf,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333", global = true)]
    pub qdrant_url: String,

    /// Qdrant collection holding case embeddings
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "case_law", global = true)]
    pub qdrant_collection: String,

    /// Directory holding the bge-small-en-v1.5 config, weights and tokenizer
    #[arg(
        long,
        env = "CASELAW_EMBEDDING_MODEL_DIR",
        default_value = DEFAULT_EMBEDDING_MODEL_DIR,
        global = true
    )]
    pub embedding_model_dir: PathBuf,

    /// Tavily API key; web augmentation is disabled when empty
    #[arg(long, env = "SEARCH_API_KEY", default_value = "", hide_env_values = true, global = true)]
    pub search_api_key: String,

    /// API key for the chat completions provider
    #[arg(long, env = "LLM_API_KEY", default_value = "", hide_env_values = true, global = true)]
    pub llm_api_key: String,

    /// Base URL of an OpenAI-compatible chat completions API
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL, global = true)]
    pub llm_base_url: String,

    /// Chat model used for answer synthesis
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL, global = true)]
    pub llm_model: String,

    /// Seconds a cached response stays valid
    #[arg(long, env = "CASELAW_CACHE_TTL_SECS", default_value = "3600", global = true)]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached responses
    #[arg(long, env = "CASELAW_CACHE_CAPACITY", default_value = "10000", global = true)]
    pub cache_capacity: u64,

    /// Upper bound on the latency of a single query
    #[arg(long, env = "CASELAW_REQUEST_TIMEOUT_SECS", default_value = "90", global = true)]
    pub request_timeout_secs: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "CASELAW_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
    /// Answer one question and print the cited response.
    Search {
        /// Legal question
        #[arg(long)]
        query: String,
        /// corpus_only or hybrid
        #[arg(long, default_value = "hybrid")]
        mode: SearchMode,
        /// Number of corpus cases to retrieve.
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Print the augmentation decision and pipeline stages.
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
    /// Print one case from the corpus.
    Case {
        #[arg(long)]
        id: u64,
    },
    /// Embed every corpus case into the Qdrant collection.
    Index,
}

impl BackendArgs {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..OrchestratorConfig::default()
        }
    }

    pub fn qdrant(&self) -> anyhow::Result<QdrantStore> {
        let embedder = BgeEmbedder::load(&self.embedding_model_dir).map_err(|error| {
            anyhow::anyhow!(
                "loading embedding model from {}: {error}",
                self.embedding_model_dir.display()
            )
        })?;
        Ok(QdrantStore::new(
            &self.qdrant_url,
            &self.qdrant_collection,
            Arc::new(embedder),
        ))
    }

    pub async fn corpus(&self) -> anyhow::Result<JsonCaseStore> {
        JsonCaseStore::load(&self.corpus_path)
            .await
            .map_err(|error| anyhow::anyhow!("loading {}: {error}", self.corpus_path.display()))
    }

    pub fn web_fetcher(&self) -> anyhow::Result<WebEvidenceFetcher> {
        if self.search_api_key.trim().is_empty() {
            warn!("SEARCH_API_KEY not set, web augmentation disabled");
            return Ok(WebEvidenceFetcher::disabled());
        }
        let client = TavilyClient::new(self.search_api_key.clone())?;
        Ok(WebEvidenceFetcher::new(Arc::new(client)))
    }

    pub fn build_orchestrator(
        &self,
        corpus: Arc<JsonCaseStore>,
    ) -> anyhow::Result<QueryOrchestrator> {
        if self.llm_api_key.trim().is_empty() {
            warn!("LLM_API_KEY not set, answer synthesis will fail");
        }
        let generator = ChatCompletionsClient::new(
            &self.llm_base_url,
            self.llm_api_key.clone(),
            &self.llm_model,
        )?;

        Ok(QueryOrchestrator::new(
            ResponseCache::in_memory(self.cache_capacity),
            EvidenceFetcher::new(Arc::new(self.qdrant()?), corpus),
            self.web_fetcher()?,
            AnswerSynthesizer::new(Arc::new(generator)),
            self.orchestrator_config(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_command_parses_mode_and_defaults() {
        let cli = Cli::try_parse_from([
            "caselaw",
            "search",
            "--query",
            "What are Miranda rights?",
            "--mode",
            "corpus_only",
        ])
        .unwrap();

        match cli.command {
            Command::Search { query, mode, limit, explain } => {
                assert_eq!(query, "What are Miranda rights?");
                assert_eq!(mode, SearchMode::CorpusOnly);
                assert_eq!(limit, 10);
                assert!(!explain);
            }
            _ => panic!("expected search command"),
        }
        assert_eq!(cli.backends.qdrant_collection, "case_law");
        assert_eq!(
            cli.backends.embedding_model_dir,
            PathBuf::from(DEFAULT_EMBEDDING_MODEL_DIR)
        );
    }

    #[test]
    fn qdrant_refuses_to_start_without_embedding_model() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("bge-small-en-v1.5");
        let cli = Cli::try_parse_from([
            "caselaw",
            "index",
            "--embedding-model-dir",
            missing.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(cli.backends.embedding_model_dir, missing);
        let error = cli.backends.qdrant().err().unwrap();
        assert!(error.to_string().contains("config.json"), "{error}");
    }

    #[test]
    fn backend_flags_map_into_orchestrator_config() {
        let cli = Cli::try_parse_from([
            "caselaw",
            "index",
            "--cache-ttl-secs",
            "60",
            "--request-timeout-secs",
            "5",
        ])
        .unwrap();

        let config = cli.backends.orchestrator_config();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.web_max_results, 5);
    }
}
