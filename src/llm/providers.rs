use super::{ChatMessage, LLMConfig, LLMProvider, LLMResponse, LLM};
use crate::error::{Result, TranscriptError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible chat-completions provider (Groq, OpenAI, LMStudio)
pub struct ChatCompletionProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

impl ChatCompletionProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }
}

/// Map a chat-completions HTTP exchange onto a response or a typed error
pub(crate) fn interpret_response(status: StatusCode, body: &str) -> Result<LLMResponse> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TranscriptError::RateLimited(
            "Please try again in a minute.".to_string(),
        ));
    }

    if !status.is_success() {
        return Err(TranscriptError::Summarization(format!(
            "API error {}: {}",
            status, body
        )));
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        TranscriptError::Summarization(format!("invalid response from API: {}", e))
    })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .map(|message| message.content)
        .ok_or_else(|| {
            TranscriptError::Summarization("invalid response from API: no choices".to_string())
        })?;

    Ok(LLMResponse {
        content,
        tokens_used: parsed.usage.map(|u| u.total_tokens),
    })
}

#[async_trait]
impl LLM for ChatCompletionProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let endpoint = self.config.resolved_endpoint();

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to {:?} at {}", self.config.provider, endpoint);

        let mut builder = self.client.post(&endpoint).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        } else if self.config.provider != LLMProvider::LMStudio {
            return Err(TranscriptError::Configuration(format!(
                "{:?} API key not configured",
                self.config.provider
            )));
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        interpret_response(status, &body)
    }

    fn provider_type(&self) -> LLMProvider {
        self.config.provider.clone()
    }
}
