use std::fmt;

/// Result type for transcript operations
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// One strategy's reason for not producing a transcript
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFailure {
    /// Name of the source that was attempted
    pub source: String,
    /// Human-readable reason
    pub reason: String,
}

impl StrategyFailure {
    pub fn new(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error types for transcript acquisition and summarization
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No transcript source succeeded ({}) [{}]", .0.len(), join_failures(.0))]
    PipelineExhausted(Vec<StrategyFailure>),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),
}
