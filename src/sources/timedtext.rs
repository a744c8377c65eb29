/// Direct caption endpoint source
use super::{AcquisitionContext, AcquisitionResult, HttpFetch, TranscriptSource};
use crate::config::{CaptionAttempt, SourceConfig};
use crate::error::{Result, TranscriptError};
use crate::parsers::{CaptionFormat, CaptionParser};
use crate::transcript::Transcript;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Asks the caption endpoint for a short, fixed list of language/format pairs
pub struct TimedTextSource {
    fetcher: Arc<dyn HttpFetch>,
    parser: Arc<CaptionParser>,
    config: SourceConfig,
}

impl TimedTextSource {
    pub fn new(fetcher: Arc<dyn HttpFetch>, parser: Arc<CaptionParser>, config: SourceConfig) -> Self {
        Self {
            fetcher,
            parser,
            config,
        }
    }

    pub fn attempt_url(&self, video_id: &str, attempt: &CaptionAttempt) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.timedtext_endpoint,
            &[
                ("lang", attempt.lang.as_str()),
                ("v", video_id),
                ("fmt", attempt.fmt.as_str()),
            ],
        )
        .map_err(|e| TranscriptError::Configuration(format!("bad timedtext endpoint: {}", e)))?;
        Ok(url.to_string())
    }

    async fn try_attempt(&self, video_id: &str, attempt: &CaptionAttempt) -> Result<Transcript> {
        let url = self.attempt_url(video_id, attempt)?;
        let response = self.fetcher.get(&url).await?;

        if !response.is_success() {
            return Err(TranscriptError::SourceUnavailable(format!("HTTP {}", response.status)));
        }
        if response.body.trim().is_empty() {
            return Err(TranscriptError::SourceUnavailable("empty response".to_string()));
        }
        if response.body.contains(&self.config.unavailable_marker) {
            return Err(TranscriptError::SourceUnavailable("captions unavailable".to_string()));
        }

        let segments = self
            .parser
            .parse(&response.body, Some(CaptionFormat::from_fmt_param(&attempt.fmt)));
        if segments.is_empty() {
            return Err(TranscriptError::SourceUnavailable("no segments parsed".to_string()));
        }
        Ok(segments)
    }
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    fn name(&self) -> &str {
        "timedtext"
    }

    async fn acquire(&self, ctx: &AcquisitionContext<'_>) -> AcquisitionResult {
        let attempts = &self.config.caption_attempts;
        let mut reasons = Vec::new();

        for (index, attempt) in attempts.iter().enumerate() {
            debug!("Caption endpoint attempt {}/{}: {}/{}", index + 1, attempts.len(), attempt.lang, attempt.fmt);

            match self.try_attempt(ctx.video_id, attempt).await {
                Ok(segments) => {
                    info!("📝 Caption endpoint returned {} segments ({}/{})", segments.len(), attempt.lang, attempt.fmt);
                    return AcquisitionResult::Found(segments);
                }
                Err(e) => {
                    let reason = match e {
                        TranscriptError::SourceUnavailable(reason) => reason,
                        other => other.to_string(),
                    };
                    warn!("Caption endpoint {}/{} failed: {}", attempt.lang, attempt.fmt, reason);
                    reasons.push(format!("{}/{}: {}", attempt.lang, attempt.fmt, reason));
                }
            }

            if index + 1 < attempts.len() && self.config.attempt_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.attempt_delay_ms)).await;
            }
        }

        AcquisitionResult::Failed(format!(
            "all {} caption endpoint attempts failed ({})",
            attempts.len(),
            reasons.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::http::testing::ScriptedFetcher;

    const JSON_BODY: &str = r#"{"events":[{"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"hi"}]}]}"#;
    const VTT_BODY: &str = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nfrom vtt\n";

    fn source(fetcher: Arc<ScriptedFetcher>) -> TimedTextSource {
        let config = SourceConfig {
            attempt_delay_ms: 0,
            ..SourceConfig::default()
        };
        TimedTextSource::new(fetcher, Arc::new(CaptionParser::default()), config)
    }

    fn url(lang: &str, fmt: &str) -> String {
        format!("https://www.youtube.com/api/timedtext?lang={}&v=abc123&fmt={}", lang, fmt)
    }

    #[test]
    fn test_attempt_url() {
        let src = source(Arc::new(ScriptedFetcher::new()));
        assert_eq!(
            src.attempt_url("abc123", &CaptionAttempt::new("en", "srv3")).unwrap(),
            url("en", "srv3")
        );
    }

    #[tokio::test]
    async fn test_later_attempt_wins_after_failures() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond(&url("en", "srv3"), 200, "")
                .respond(&url("en", "vtt"), 200, VTT_BODY),
        );
        let src = source(fetcher.clone());

        let result = src.acquire(&AcquisitionContext::new("abc123")).await;
        match result {
            AcquisitionResult::Found(segments) => {
                assert_eq!(segments.len(), 1);
                assert_eq!(segments[0].text(), "from vtt");
            }
            other => panic!("unexpected {:?}", other),
        }
        // The third combination is never requested
        assert_eq!(fetcher.requested(), vec![url("en", "srv3"), url("en", "vtt")]);
    }

    #[tokio::test]
    async fn test_unavailable_marker_and_status_fail_each_attempt() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond(&url("en", "srv3"), 404, "")
                .respond(&url("en", "vtt"), 200, "<html>Video unavailable</html>")
                .respond(&url("en-US", "srv3"), 200, "<transcript></transcript>"),
        );
        let src = source(fetcher);

        match src.acquire(&AcquisitionContext::new("abc123")).await {
            AcquisitionResult::Failed(reason) => {
                assert!(reason.contains("en/srv3: HTTP 404"));
                assert!(reason.contains("en/vtt: captions unavailable"));
                assert!(reason.contains("en-US/srv3: no segments parsed"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hint_mismatch_still_parses() {
        // srv3 was requested but JSON came back
        let fetcher = Arc::new(ScriptedFetcher::new().respond(&url("en", "srv3"), 200, JSON_BODY));
        let src = source(fetcher);

        assert!(src.acquire(&AcquisitionContext::new("abc123")).await.is_found());
    }
}
