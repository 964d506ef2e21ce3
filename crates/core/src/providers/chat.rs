use crate::error::BackendError;
use crate::traits::{AnswerGenerator, GenerationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
const MAX_TOKENS: u32 = 2000;

/// Synthesis provider speaking the OpenAI-compatible chat completions API.
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(120)).build()?,
            endpoint: base.join("chat/completions")?,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

pub fn build_messages(request: &GenerationRequest<'_>) -> Value {
    json!([
        { "role": "system", "content": request.system_prompt },
        {
            "role": "user",
            "content": format!(
                "{}\n\nQUESTION: {}\n\nProvide a comprehensive legal analysis with proper citations.",
                request.context, request.query
            )
        }
    ])
}

pub fn parse_completion(body: &Value) -> Result<String, BackendError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BackendError::response("llm", "completion contained no message content"))
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, BackendError> {
        if self.api_key.trim().is_empty() {
            return Err(BackendError::NotConfigured("llm api key is empty".to_string()));
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": build_messages(&request),
                "temperature": request.temperature,
                "max_tokens": MAX_TOKENS,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::response("llm", response.status().to_string()));
        }

        let body: Value = response.json().await?;
        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_regardless_of_trailing_slash() {
        let with_slash = ChatCompletionsClient::new("https://api.deepseek.com/", "k", "m").unwrap();
        let without = ChatCompletionsClient::new("https://llm.example.test/v1", "k", "m").unwrap();
        assert_eq!(with_slash.endpoint().as_str(), "https://api.deepseek.com/chat/completions");
        assert_eq!(without.endpoint().as_str(), "https://llm.example.test/v1/chat/completions");
    }

    #[test]
    fn messages_carry_context_then_question() {
        let request = GenerationRequest {
            system_prompt: "system",
            context: "RELEVANT CASE LAW:\n1. Miranda v. Arizona",
            query: "What are Miranda rights?",
            temperature: 0.3,
        };
        let messages = build_messages(&request);
        assert_eq!(messages[0]["content"], "system");
        let user = messages[1]["content"].as_str().unwrap();
        assert!(user.starts_with("RELEVANT CASE LAW"));
        assert!(user.contains("QUESTION: What are Miranda rights?"));
    }

    #[test]
    fn empty_completion_is_an_error() {
        let body = json!({ "choices": [ { "message": { "content": "   " } } ] });
        assert!(parse_completion(&body).is_err());

        let body = json!({ "choices": [ { "message": { "content": "Answer." } } ] });
        assert_eq!(parse_completion(&body).unwrap(), "Answer.");
    }
}
