use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

pub const DEFAULT_MODEL: &str = "mistral-large-latest";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Unexpected LLM response: {0}")]
    MalformedResponse(String),
}

/// A chat model that turns a rendered review prompt into review text.
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Single-turn completion; no streaming, no retry.
    async fn review(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Client for Mistral's `/v1/chat/completions` endpoint.
pub struct MistralClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl MistralClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let llm = &config.settings.llm;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: llm.api_base.trim_end_matches('/').to_string(),
            api_key: config.llm_api_key.clone(),
            model: llm.model.clone(),
            temperature: llm.temperature,
        })
    }
}

#[async_trait]
impl ReviewModel for MistralClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_bytes = prompt.len()))]
    async fn review(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.api_base);
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("sending chat completion request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let completion = response.json::<ChatResponse>().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no message content in choices".to_string()))?;
        debug!(response_bytes = content.len(), "received completion");

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use mockito::Matcher;
    use serde_json::json;

    fn completion(content: &str) -> String {
        json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "model": "mistral-large-latest",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_review_returns_message_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer mistral-test")
            .match_body(Matcher::Json(json!({
                "model": "mistral-large-latest",
                "temperature": 0.7,
                "messages": [{"role": "user", "content": "review this"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion("Line 3: SOQL in loop"))
            .create_async()
            .await;

        let client = MistralClient::new(&test_config(&server.url())).unwrap();
        let text = client.review("review this").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Line 3: SOQL in loop");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_review_surfaces_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"message":"Requests rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = MistralClient::new(&test_config(&server.url())).unwrap();
        let err = client.review("x").await.unwrap_err();
        match err {
            LlmError::Status { status, body } => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert!(body.contains("rate limit"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_review_rejects_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = MistralClient::new(&test_config(&server.url())).unwrap();
        let err = client.review("x").await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_configured_model_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"model": "mistral-small-latest"})))
            .with_status(200)
            .with_body(completion("ok"))
            .create_async()
            .await;

        let mut config = test_config(&server.url());
        config.settings.llm.model = "mistral-small-latest".to_string();
        let client = MistralClient::new(&config).unwrap();
        client.review("x").await.unwrap();
        mock.assert_async().await;
    }
}
