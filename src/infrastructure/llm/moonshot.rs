use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{
    ports::{CompletionService, FragmentStream},
    DomainError, Message,
};
use crate::infrastructure::config::LlmConfig;
use crate::infrastructure::http::{build_client, ensure_success};
use crate::infrastructure::llm::sse::delta_stream;

const PROVIDER: &str = "moonshot";

/// Moonshot (Kimi) chat completions over the OpenAI-compatible API.
pub struct MoonshotLlm {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl MoonshotLlm {
    pub fn new(config: &LlmConfig) -> Result<Self, DomainError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DomainError::config("missing KIMI_KEY"))?;

        Ok(Self {
            client: build_client(config.timeout())?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, messages: &'a [Message], stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            stream,
            temperature: self.temperature,
        }
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response, DomainError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(messages, stream))
            .send()
            .await?;
        ensure_success(resp, PROVIDER).await
    }
}

fn parse_completion(raw: &str) -> Result<String, DomainError> {
    let resp: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| DomainError::malformed(format!("{PROVIDER}: {e}")))?;

    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| DomainError::malformed(format!("{PROVIDER}: no message content")))
}

#[async_trait]
impl CompletionService for MoonshotLlm {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[Message]) -> Result<String, DomainError> {
        let body = self.send(messages, false).await?.text().await?;
        parse_completion(&body)
    }

    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream, DomainError> {
        let resp = self.send(messages, true).await?;
        Ok(delta_stream(resp.bytes_stream()))
    }
}
