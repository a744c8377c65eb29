/// Caption acquisition sources
///
/// Each source is one structurally different way of getting caption data for
/// a video. Sources never return errors to the pipeline: every attempt ends in
/// an `AcquisitionResult` so the pipeline can move on to the next source.

pub mod dom;
pub mod http;
pub mod innertube;
pub mod timedtext;
pub mod watch_page;

pub use dom::{DomSource, ElementHandle, PageAutomation, PageElement};
pub use http::{HttpFetch, HttpResponse, ReqwestFetcher};
pub use innertube::InnertubeSource;
pub use timedtext::TimedTextSource;
pub use watch_page::WatchPageSource;

use crate::error::TranscriptError;
use crate::transcript::Transcript;
use async_trait::async_trait;

/// Outcome of one source attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionResult {
    /// A non-empty transcript
    Found(Transcript),
    /// The source answered but held no usable captions
    Empty,
    /// The source could not be used
    Failed(String),
}

impl AcquisitionResult {
    /// Normalize a source's internal result, treating an empty transcript as `Empty`
    pub fn from_result(result: crate::error::Result<Transcript>) -> Self {
        match result {
            Ok(transcript) if transcript.is_empty() => AcquisitionResult::Empty,
            Ok(transcript) => AcquisitionResult::Found(transcript),
            Err(TranscriptError::SourceUnavailable(reason)) => AcquisitionResult::Failed(reason),
            Err(e) => AcquisitionResult::Failed(e.to_string()),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, AcquisitionResult::Found(_))
    }
}

/// What a source gets to work with
#[derive(Clone, Copy)]
pub struct AcquisitionContext<'a> {
    pub video_id: &'a str,
    /// Live page for DOM extraction, when the caller has one
    pub page: Option<&'a dyn PageAutomation>,
}

impl<'a> AcquisitionContext<'a> {
    pub fn new(video_id: &'a str) -> Self {
        Self { video_id, page: None }
    }

    pub fn with_page(mut self, page: &'a dyn PageAutomation) -> Self {
        self.page = Some(page);
        self
    }
}

/// One method of obtaining a transcript
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    fn name(&self) -> &str;

    async fn acquire(&self, ctx: &AcquisitionContext<'_>) -> AcquisitionResult;
}
