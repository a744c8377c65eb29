use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, StrategyFailure, TranscriptError};
use crate::parsers::CaptionParser;
use crate::sources::{
    AcquisitionContext, AcquisitionResult, DomSource, HttpFetch, InnertubeSource, PageAutomation,
    ReqwestFetcher, TimedTextSource, TranscriptSource, WatchPageSource,
};
use crate::transcript::{assemble, resolve_video_id, AssembledTranscript, Transcript};

/// Result of a successful acquisition
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Name of the source that produced the transcript
    pub source: String,
    pub transcript: Transcript,
    /// Sources that were tried before the winner, in order
    pub failures: Vec<StrategyFailure>,
    pub elapsed: Duration,
}

/// Assembled transcript together with how it was obtained
#[derive(Debug, Clone)]
pub struct FetchedTranscript {
    pub assembled: AssembledTranscript,
    pub outcome: PipelineOutcome,
}

/// Runs transcript sources one after another until one yields segments
pub struct TranscriptPipeline {
    sources: Vec<Box<dyn TranscriptSource>>,
}

impl TranscriptPipeline {
    /// Build the standard source chain: caption endpoint, watch page,
    /// internal API and live page, in that order
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new(&config.http)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Standard source chain over a caller-supplied fetcher
    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn HttpFetch>) -> Self {
        let parser = Arc::new(CaptionParser::new(&config.parsing));

        let sources: Vec<Box<dyn TranscriptSource>> = vec![
            Box::new(TimedTextSource::new(fetcher.clone(), parser.clone(), config.sources.clone())),
            Box::new(WatchPageSource::new(fetcher.clone(), parser, config.sources.clone())),
            Box::new(InnertubeSource::new(fetcher, config.sources.clone())),
            Box::new(DomSource::new(config.dom.clone())),
        ];

        Self::with_sources(sources)
    }

    pub fn with_sources(sources: Vec<Box<dyn TranscriptSource>>) -> Self {
        info!("🔧 Transcript pipeline with {} sources", sources.len());
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Try each source in order. The first `Found` wins; everything before it
    /// is kept as a failure. Exhaustion reports every reason in attempt order.
    pub async fn acquire(&self, ctx: &AcquisitionContext<'_>) -> Result<PipelineOutcome> {
        let start_time = Instant::now();
        let mut failures = Vec::new();

        for source in &self.sources {
            info!("🔍 Trying source '{}' for {}", source.name(), ctx.video_id);

            match source.acquire(ctx).await {
                AcquisitionResult::Found(transcript) => {
                    let elapsed = start_time.elapsed();
                    info!(
                        "✅ '{}' produced {} segments in {:.2}s",
                        source.name(),
                        transcript.len(),
                        elapsed.as_secs_f64()
                    );
                    return Ok(PipelineOutcome {
                        source: source.name().to_string(),
                        transcript,
                        failures,
                        elapsed,
                    });
                }
                AcquisitionResult::Empty => {
                    debug!("'{}' returned no segments", source.name());
                    failures.push(StrategyFailure::new(source.name(), "no segments"));
                }
                AcquisitionResult::Failed(reason) => {
                    warn!("❌ '{}' failed: {}", source.name(), reason);
                    failures.push(StrategyFailure::new(source.name(), reason));
                }
            }
        }

        Err(TranscriptError::PipelineExhausted(failures))
    }

    /// Resolve `input` to a video id, acquire a transcript and assemble it
    pub async fn fetch(&self, input: &str, page: Option<&dyn PageAutomation>) -> Result<FetchedTranscript> {
        let video_id = resolve_video_id(input)?;

        let mut ctx = AcquisitionContext::new(&video_id);
        if let Some(page) = page {
            ctx = ctx.with_page(page);
        }

        let outcome = self.acquire(&ctx).await?;

        let mut assembled = assemble(&outcome.transcript);
        assembled.video_id = video_id.clone();
        assembled.source = outcome.source.clone();

        Ok(FetchedTranscript { assembled, outcome })
    }
}
