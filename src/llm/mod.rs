pub mod providers;
pub mod summary;

pub use summary::TranscriptSummarizer;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// LLM provider types; all speak the chat-completions protocol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LLMProvider {
    Groq,
    OpenAI,
    LMStudio,
}

impl LLMProvider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LLMProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
            LLMProvider::OpenAI => "https://api.openai.com/v1/chat/completions",
            LLMProvider::LMStudio => "http://localhost:1234/v1/chat/completions",
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Groq,
            endpoint: None,
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 2048,
            temperature: 0.3,
            timeout_seconds: 120,
        }
    }
}

impl LLMConfig {
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers
#[async_trait]
pub trait LLM: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse>;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Box<dyn LLM>> {
    Ok(Box::new(providers::ChatCompletionProvider::new(config.clone())?))
}
