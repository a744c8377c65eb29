/// yt-digest - YouTube transcript acquisition
///
/// Obtains a video's captions through several independent sources, normalizes
/// every caption format into one segment model and flattens the result for
/// summarization.

pub mod config;
pub mod error;
pub mod llm;
pub mod parsers;
pub mod pipeline;
pub mod sources;
pub mod transcript;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder, LoadedConfig};
pub use crate::error::{Result, StrategyFailure, TranscriptError};
pub use crate::llm::{LLMConfig, LLMProvider, TranscriptSummarizer};
pub use crate::parsers::{CaptionFormat, CaptionParser};
pub use crate::pipeline::{FetchedTranscript, PipelineOutcome, TranscriptPipeline};
pub use crate::sources::{AcquisitionContext, AcquisitionResult, PageAutomation, TranscriptSource};
pub use crate::transcript::{assemble, extract_video_id, AssembledTranscript, Segment, Transcript};
