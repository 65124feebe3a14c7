//! Chat-completion client for the analysis model.
//!
//! The model is an injected dependency: the engine only sees [`ChatModel`],
//! and whether one exists at all is decided once, at construction time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::AnalysisFailure;

/// A single-turn chat completion: system instructions plus one user message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AnalysisFailure>;
}

/// OpenAI-compatible `/v1/chat/completions` client (DeepSeek, OpenAI, Ollama's
/// compatibility layer, ...).
pub struct OpenAiChat {
    client: reqwest::Client,
    config: ChatConfig,
    api_key: String,
}

impl OpenAiChat {
    /// Returns `None` when no API key is configured, which disables the
    /// model path for the lifetime of the process.
    pub fn from_config(client: reqwest::Client, config: &ChatConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty())?;
        Some(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AnalysisFailure> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let req = OpenAiChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await
            .map_err(|e| AnalysisFailure::Transport(format!("failed to call chat API: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisFailure::Transport(format!(
                "chat API returned {status}: {body}"
            )));
        }

        let body: OpenAiChatResponse = resp.json().await.map_err(|e| {
            AnalysisFailure::Transport(format!("failed to decode chat API response: {e}"))
        })?;

        first_content(body)
    }
}

fn first_content(body: OpenAiChatResponse) -> Result<String, AnalysisFailure> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AnalysisFailure::Schema {
            reason: "chat API returned no message content".to_string(),
            raw: String::new(),
        })
}
