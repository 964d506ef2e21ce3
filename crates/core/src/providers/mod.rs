pub mod chat;
pub mod tavily;

pub use chat::{ChatCompletionsClient, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
pub use tavily::{TavilyClient, LEGAL_DOMAINS};
