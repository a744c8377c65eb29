use super::{create_llm, ChatMessage, LLMConfig, LLM};
use crate::error::{Result, TranscriptError};
use tracing::{debug, info};

const SUMMARY_INSTRUCTIONS: &str = "Summarize the following YouTube video transcript in clear, \
fluent English. The summary should be in the format:\n\
- emoji bullet points\n\
It must capture the main points and key takeaways from the video. \
Do not include any extraneous details or commentary. If the transcript is \
not in English, translate and summarize it in English only.";

/// Hands an assembled transcript to the configured LLM for summarization
pub struct TranscriptSummarizer {
    llm: Box<dyn LLM>,
}

impl TranscriptSummarizer {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let llm = create_llm(config)?;
        info!("✅ Summarizer initialized with {:?} provider", llm.provider_type());
        Ok(Self { llm })
    }

    /// Use an already constructed LLM
    pub fn with_llm(llm: Box<dyn LLM>) -> Self {
        Self { llm }
    }

    pub fn build_prompt(transcript: &str) -> String {
        format!("{}\n\n{}", SUMMARY_INSTRUCTIONS, transcript)
    }

    pub async fn summarize(&self, transcript: &str) -> Result<String> {
        if transcript.trim().is_empty() {
            return Err(TranscriptError::InvalidInput(
                "No transcript provided".to_string(),
            ));
        }

        debug!("Summarizing transcript ({} chars)", transcript.len());
        let response = self
            .llm
            .chat(vec![ChatMessage::user(Self::build_prompt(transcript))])
            .await?;

        if let Some(tokens) = response.tokens_used {
            debug!("Summary used {} tokens", tokens);
        }

        let summary = response.content.trim().to_string();
        if summary.is_empty() {
            return Ok("No summary available.".to_string());
        }
        Ok(summary)
    }
}
