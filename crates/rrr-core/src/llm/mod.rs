//! Language-model adapters
//!
//! [`ChatClient`] is the single natural-language capability the pipeline's
//! LLM-backed collaborators share. [`AzureChatClient`] speaks the Azure
//! OpenAI chat-completions protocol.

mod json;
mod judge;
mod prompts;
mod report;
mod structurer;

pub use json::recover_json;
pub use judge::{parse_judgement, LlmJudge, UNPARSED_EVALUATION};
pub use report::{strip_code_fences, LlmReportWriter};
pub use structurer::LlmStructurer;

use crate::config::LlmConfig;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Sampling settings for one completion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChatOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling
    pub top_p: Option<f32>,
    /// Response token cap
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    /// Settings for structuring and report writing
    #[must_use]
    pub fn generation(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: Some(config.top_p),
            max_tokens: None,
        }
    }

    /// Settings for the judge
    #[must_use]
    pub fn judge(config: &LlmConfig) -> Self {
        Self {
            temperature: config.judge_temperature,
            top_p: None,
            max_tokens: Some(config.judge_max_tokens),
        }
    }
}

/// Single-turn text completion
#[async_trait]
pub trait ChatClient: Send + Sync + Debug {
    /// Complete `prompt`
    async fn complete(&self, prompt: &str, options: ChatOptions)
        -> Result<String, CollaboratorError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Azure OpenAI chat-completions client
#[derive(Debug, Clone)]
pub struct AzureChatClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl AzureChatClient {
    /// Client for the deployment described by `config`
    ///
    /// # Errors
    /// [`CollaboratorError::NotConfigured`] if endpoint, deployment or key
    /// is missing.
    pub fn new(config: &LlmConfig) -> Result<Self, CollaboratorError> {
        if !config.is_configured() {
            return Err(CollaboratorError::NotConfigured(
                "LLM endpoint, deployment and API key are required".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            url: completions_url(config),
            api_key: config.api_key.clone().unwrap_or_default(),
        })
    }
}

fn completions_url(config: &LlmConfig) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        config.endpoint.trim_end_matches('/'),
        config.deployment,
        config.api_version
    )
}

#[async_trait]
impl ChatClient for AzureChatClient {
    async fn complete(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<String, CollaboratorError> {
        let request = ChatRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
        };

        let response = self
            .http
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::Malformed("completion has no content".into()))
    }
}
