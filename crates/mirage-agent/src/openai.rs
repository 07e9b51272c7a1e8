//! OpenAI-compatible chat completions client.

use crate::converse::Converse;
use crate::error::AgentError;
use crate::protocol::{Message, ModelReply, ToolCall, ToolDefinition};
use async_trait::async_trait;
use mirage_core::ModelConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat completions client implementing [`Converse`].
#[derive(Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiChat {
    /// Build a client from configuration, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &ModelConfig) -> Result<Self, AgentError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AgentError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            url: config.completions_url(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "<[ToolDefinition]>::is_empty")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

impl From<ResponseMessage> for ModelReply {
    fn from(message: ResponseMessage) -> Self {
        match message.tool_calls {
            Some(calls) if !calls.is_empty() => ModelReply::ToolCalls {
                content: message.content,
                calls,
            },
            _ => ModelReply::Final(message.content.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl Converse for OpenAiChat {
    async fn converse(
        &self,
        transcript: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, AgentError> {
        let body = ChatRequest {
            model: &self.model,
            messages: transcript,
            tools,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }

        let api_response: ChatResponse = response.json().await?;
        api_response
            .choices
            .into_iter()
            .next()
            .map(|c| ModelReply::from(c.message))
            .ok_or(AgentError::EmptyResponse)
    }
}
