/// Internal transcript API source
use super::{AcquisitionContext, AcquisitionResult, HttpFetch, TranscriptSource};
use crate::config::SourceConfig;
use crate::error::{Result, TranscriptError};
use crate::parsers::embedded::segments_from_cue_groups;
use crate::transcript::Transcript;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CUE_GROUPS_PATH: &str =
    "/updateEngagementPanelAction/content/transcriptRenderer/body/transcriptBodyRenderer/cueGroups";

/// Encode the video id as protobuf field 1 (length-delimited), base64'd
pub fn encode_params(video_id: &str) -> String {
    let id = video_id.as_bytes();
    let mut message = vec![0x0a];
    let mut len = id.len();
    while len >= 0x80 {
        message.push((len as u8 & 0x7f) | 0x80);
        len >>= 7;
    }
    message.push(len as u8);
    message.extend_from_slice(id);
    STANDARD.encode(message)
}

pub struct InnertubeSource {
    fetcher: Arc<dyn HttpFetch>,
    config: SourceConfig,
}

impl InnertubeSource {
    pub fn new(fetcher: Arc<dyn HttpFetch>, config: SourceConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn request_body(&self, video_id: &str) -> Value {
        json!({
            "context": {
                "client": {
                    "clientName": self.config.innertube_client_name,
                    "clientVersion": self.config.innertube_client_version,
                    "hl": "en",
                }
            },
            "params": encode_params(video_id),
        })
    }

    async fn request(&self, video_id: &str) -> Result<Transcript> {
        let response = self
            .fetcher
            .post_json(&self.config.innertube_endpoint, &self.request_body(video_id))
            .await?;

        if !response.is_success() {
            return Err(TranscriptError::SourceUnavailable(format!(
                "transcript API HTTP {}",
                response.status
            )));
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(payload) => Ok(segments_from_response(&payload)),
            Err(e) => {
                debug!("Transcript API body is not JSON: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// Walk `actions[]` for the first cue group list. Any other shape yields nothing.
pub fn segments_from_response(payload: &Value) -> Transcript {
    let Some(actions) = payload.get("actions").and_then(Value::as_array) else {
        debug!("Transcript API response has no actions");
        return Vec::new();
    };

    actions
        .iter()
        .filter_map(|action| action.pointer(CUE_GROUPS_PATH))
        .map(segments_from_cue_groups)
        .find(|segments| !segments.is_empty())
        .unwrap_or_default()
}

#[async_trait]
impl TranscriptSource for InnertubeSource {
    fn name(&self) -> &str {
        "innertube"
    }

    async fn acquire(&self, ctx: &AcquisitionContext<'_>) -> AcquisitionResult {
        let result = self.request(ctx.video_id).await;
        match &result {
            Ok(segments) if !segments.is_empty() => {
                info!("🔌 Transcript API returned {} segments", segments.len())
            }
            Ok(_) => debug!("Transcript API returned no cues"),
            Err(e) => warn!("Transcript API request failed: {}", e),
        }
        AcquisitionResult::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::http::testing::ScriptedFetcher;

    const ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/get_transcript";

    fn api_response() -> Value {
        json!({
            "responseContext": {},
            "actions": [{
                "clickTrackingParams": "x",
                "updateEngagementPanelAction": {"content": {"transcriptRenderer": {"body": {
                    "transcriptBodyRenderer": {"cueGroups": [
                        {"transcriptCueGroupRenderer": {"cues": [{"transcriptCueRenderer": {
                            "cue": {"simpleText": "first line"}, "startOffsetMs": "0", "durationMs": "1500"
                        }}]}},
                        {"transcriptCueGroupRenderer": {"cues": [{"transcriptCueRenderer": {
                            "cue": {"runs": [{"text": "second "}, {"text": "line"}]}, "startOffsetMs": 1500, "durationMs": 2000
                        }}]}}
                    ]}
                }}}}
            }]
        })
    }

    #[test]
    fn test_encode_params() {
        // 0x0a 0x0b "dQw4w9WgXcQ"
        assert_eq!(encode_params("dQw4w9WgXcQ"), "CgtkUXc0dzlXZ1hjUQ==");
    }

    #[test]
    fn test_segments_from_response() {
        let segments = segments_from_response(&api_response());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text(), "second line");
        assert_eq!(segments[1].start(), 1.5);
        assert_eq!(segments[1].end(), 3.5);
    }

    #[test]
    fn test_unexpected_shape_is_empty() {
        assert!(segments_from_response(&json!({"actions": [{"somethingElse": {}}]})).is_empty());
        assert!(segments_from_response(&json!({"error": {"code": 400}})).is_empty());
    }

    #[tokio::test]
    async fn test_acquire_posts_context_and_params() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond(ENDPOINT, 200, &api_response().to_string()));
        let source = InnertubeSource::new(fetcher.clone(), SourceConfig::default());

        assert!(source.acquire(&AcquisitionContext::new("dQw4w9WgXcQ")).await.is_found());

        let posted = fetcher.posted.lock().unwrap();
        assert_eq!(posted[0]["context"]["client"]["clientName"], "WEB");
        assert_eq!(posted[0]["params"], "CgtkUXc0dzlXZ1hjUQ==");
    }

    #[tokio::test]
    async fn test_structure_mismatch_is_empty_and_transport_failure_fails() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond(ENDPOINT, 200, r#"{"actions": []}"#));
        let source = InnertubeSource::new(fetcher, SourceConfig::default());
        assert_eq!(source.acquire(&AcquisitionContext::new("abc123")).await, AcquisitionResult::Empty);

        let fetcher = Arc::new(ScriptedFetcher::new().respond(ENDPOINT, 200, "<html>Before you continue</html>"));
        let source = InnertubeSource::new(fetcher, SourceConfig::default());
        assert_eq!(source.acquire(&AcquisitionContext::new("abc123")).await, AcquisitionResult::Empty);

        let source = InnertubeSource::new(Arc::new(ScriptedFetcher::new()), SourceConfig::default());
        match source.acquire(&AcquisitionContext::new("abc123")).await {
            AcquisitionResult::Failed(reason) => assert!(reason.contains("connection refused")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
