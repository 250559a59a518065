//! Deepseek chat client: one non-streamed chat-completions call per prompt.
//! Mode picks the system prompt, temperature, and token budget.

use crate::error::{HubError, Result};
use crate::store::ChatMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const NO_CONTENT: &str = "No content returned.";

const NORMAL_SYSTEM_PROMPT: &str = "You are Deepseek. Be accurate and helpful.";
const CODER_SYSTEM_PROMPT: &str =
    "You are Deepseek Coder. Provide complete, large, copy-ready code with explanations when needed.";

impl ChatMode {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            ChatMode::Normal => NORMAL_SYSTEM_PROMPT,
            ChatMode::Coder => CODER_SYSTEM_PROMPT,
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            ChatMode::Normal => 0.7,
            ChatMode::Coder => 0.2,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            ChatMode::Normal => 2048,
            ChatMode::Coder => 8192,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Request body for `history` in `mode`, system prompt first.
pub fn build_request(model: &str, history: &[ChatMessage], mode: ChatMode) -> ChatRequest {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(mode.system_prompt()));
    messages.extend_from_slice(history);
    ChatRequest {
        model: model.to_string(),
        messages,
        temperature: mode.temperature(),
        max_tokens: mode.max_tokens(),
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Option<Vec<CompletionChoice>>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// First choice's content, or [`NO_CONTENT`] when it is missing or empty.
pub fn parse_reply(body: &str) -> Result<String> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(HubError::ChatReply)?;
    Ok(parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| NO_CONTENT.to_string()))
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, history: &[ChatMessage], mode: ChatMode) -> Result<String>;
}

pub struct DeepseekClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl DeepseekClient {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    pub fn from_config(cfg: &crate::HubConfig) -> Result<Self> {
        Self::new(&cfg.api_key, &cfg.api_url, &cfg.model)
    }
}

#[async_trait]
impl ChatClient for DeepseekClient {
    async fn chat(&self, history: &[ChatMessage], mode: ChatMode) -> Result<String> {
        let body = build_request(&self.model, history, mode);
        tracing::debug!(mode = %mode, messages = body.messages.len(), "chat request");

        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(HubError::ChatApi {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_reply(&text)
    }
}
