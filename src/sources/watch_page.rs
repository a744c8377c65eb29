/// Watch page scraping source
///
/// Pulls the embedded player state out of the rendered watch page, picks a
/// caption track and downloads it.
use super::{AcquisitionContext, AcquisitionResult, HttpFetch, TranscriptSource};
use crate::config::SourceConfig;
use crate::error::{Result, TranscriptError};
use crate::parsers::embedded::extract_balanced;
use crate::parsers::{CaptionFormat, CaptionParser};
use crate::transcript::Transcript;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Anchors for the player state blob, tried in order
static PLAYER_RESPONSE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bytInitialPlayerResponse\s*=\s*\{",
        r#"\["ytInitialPlayerResponse"\]\s*=\s*\{"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Where caption tracks live inside the player state
const CAPTION_TRACK_PATHS: [&str; 2] = [
    "/captions/playerCaptionsTracklistRenderer/captionTracks",
    "/playerCaptionsTracklistRenderer/captionTracks",
];

const ENGLISH_CODES: [&str; 3] = ["en", "en-US", "en-GB"];

/// One caption track entry from the player state
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    /// `"asr"` for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn language(&self) -> &str {
        self.language_code.as_deref().unwrap_or("")
    }

    fn is_english(&self) -> bool {
        ENGLISH_CODES.contains(&self.language())
    }

    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Locate and parse the embedded player state
pub fn extract_player_response(page: &str) -> Result<Value> {
    let mut matched = false;

    for pattern in PLAYER_RESPONSE_PATTERNS.iter() {
        let Some(found) = pattern.find(page) else {
            continue;
        };
        matched = true;
        let Some(fragment) = extract_balanced(page, found.end() - 1) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(fragment) {
            return Ok(value);
        }
    }

    let reason = if matched {
        "player response is not valid JSON"
    } else {
        "player response not found in page"
    };
    Err(TranscriptError::SourceUnavailable(reason.to_string()))
}

/// Reject player states that report the video can't be played
pub fn check_playability(player: &Value) -> Result<()> {
    match player.pointer("/playabilityStatus/status").and_then(Value::as_str) {
        Some(status @ ("ERROR" | "LOGIN_REQUIRED" | "UNPLAYABLE")) => Err(
            TranscriptError::SourceUnavailable(format!("playability status {}", status)),
        ),
        _ => Ok(()),
    }
}

/// Caption tracks with a usable URL, from whichever known path holds them
pub fn caption_tracks(player: &Value) -> Vec<CaptionTrack> {
    CAPTION_TRACK_PATHS
        .iter()
        .filter_map(|path| player.pointer(path).and_then(Value::as_array))
        .next()
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|t| serde_json::from_value::<CaptionTrack>(t.clone()).ok())
                .filter(|t| t.base_url.as_deref().is_some_and(|u| !u.is_empty()))
                .collect()
        })
        .unwrap_or_default()
}

/// Generated English, then English, then any `en*`, then the first track
pub fn select_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.is_generated() && t.is_english())
        .or_else(|| tracks.iter().find(|t| t.is_english()))
        .or_else(|| tracks.iter().find(|t| t.language().starts_with("en")))
        .or_else(|| tracks.first())
}

pub struct WatchPageSource {
    fetcher: Arc<dyn HttpFetch>,
    parser: Arc<CaptionParser>,
    config: SourceConfig,
}

impl WatchPageSource {
    pub fn new(fetcher: Arc<dyn HttpFetch>, parser: Arc<CaptionParser>, config: SourceConfig) -> Self {
        Self {
            fetcher,
            parser,
            config,
        }
    }

    /// The bare track URL, then the same URL with the format override
    pub fn track_urls(&self, base_url: &str) -> Result<Vec<String>> {
        let base = Url::parse(&self.config.watch_url)
            .and_then(|origin| origin.join(base_url))
            .map_err(|e| TranscriptError::SourceUnavailable(format!("bad caption track URL: {}", e)))?;

        let mut urls = vec![base.to_string()];

        if !self.config.track_format_override.is_empty() {
            let mut overridden = base.clone();
            let pairs: Vec<(String, String)> = base
                .query_pairs()
                .filter(|(key, _)| key != "fmt")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            overridden
                .query_pairs_mut()
                .clear()
                .extend_pairs(pairs)
                .append_pair("fmt", &self.config.track_format_override);
            urls.push(overridden.to_string());
        }

        Ok(urls)
    }

    fn check_markers(&self, page: &str) -> Result<()> {
        match self
            .config
            .watch_page_unavailable_markers
            .iter()
            .find(|m| page.contains(m.as_str()))
        {
            Some(marker) => Err(TranscriptError::SourceUnavailable(format!("page reports: {}", marker))),
            None => Ok(()),
        }
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Transcript> {
        let base_url = track.base_url.as_deref().unwrap_or("");
        let urls = self.track_urls(base_url)?;

        for (index, url) in urls.iter().enumerate() {
            match self.fetcher.get(url).await {
                Ok(response) if response.is_success() && !response.body.trim().is_empty() => {
                    debug!("Caption track body from attempt {} ({} bytes)", index + 1, response.body.len());
                    return Ok(self.parser.parse(&response.body, None));
                }
                Ok(response) => debug!("Caption track attempt {} gave HTTP {} / empty body", index + 1, response.status),
                Err(e) => debug!("Caption track attempt {} failed: {}", index + 1, e),
            }

            if index + 1 < urls.len() && self.config.attempt_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.attempt_delay_ms)).await;
            }
        }

        Err(TranscriptError::SourceUnavailable(format!(
            "caption track {} returned no data",
            track.language()
        )))
    }

    async fn scrape(&self, video_id: &str) -> Result<Transcript> {
        let url = format!("{}{}", self.config.watch_url, urlencoding::encode(video_id));
        let page = self.fetcher.get(&url).await?;
        if !page.is_success() {
            return Err(TranscriptError::SourceUnavailable(format!("watch page HTTP {}", page.status)));
        }

        self.check_markers(&page.body)?;
        let player = extract_player_response(&page.body)?;
        check_playability(&player)?;

        let tracks = caption_tracks(&player);
        let Some(track) = select_track(&tracks) else {
            // Page markup goes to the embedded parser only, never the sniffing facade
            let embedded = self
                .parser
                .parser_for(CaptionFormat::EmbeddedHtml)
                .parse(&page.body);
            if !embedded.is_empty() {
                info!("📄 Using transcript embedded in the watch page");
                return Ok(embedded);
            }
            return Err(TranscriptError::SourceUnavailable(
                "no caption tracks in player response".to_string(),
            ));
        };

        info!(
            "🎯 Selected caption track {} (auto-generated: {}) from {} tracks",
            track.language(),
            track.is_generated(),
            tracks.len()
        );
        self.fetch_track(track).await
    }
}

#[async_trait]
impl TranscriptSource for WatchPageSource {
    fn name(&self) -> &str {
        "watch_page"
    }

    async fn acquire(&self, ctx: &AcquisitionContext<'_>) -> AcquisitionResult {
        let result = self.scrape(ctx.video_id).await;
        if let Err(e) = &result {
            warn!("Watch page scrape failed: {}", e);
        }
        AcquisitionResult::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::http::testing::ScriptedFetcher;
    use serde_json::json;

    const WATCH_URL: &str = "https://www.youtube.com/watch?v=abc123";

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: Some(format!("https://www.youtube.com/api/timedtext?v=abc123&lang={}", lang)),
            language_code: Some(lang.to_string()),
            kind: kind.map(str::to_string),
        }
    }

    fn page_with_player(player: &Value) -> String {
        format!(
            "<html><script>var ytInitialPlayerResponse = {};var meta = {{}};</script></html>",
            player
        )
    }

    fn source(fetcher: Arc<ScriptedFetcher>) -> WatchPageSource {
        let config = SourceConfig {
            attempt_delay_ms: 0,
            ..SourceConfig::default()
        };
        WatchPageSource::new(fetcher, Arc::new(CaptionParser::default()), config)
    }

    #[test]
    fn test_track_priority() {
        let tracks = vec![track("de", None), track("en-IN", None), track("en", None), track("en", Some("asr"))];
        assert_eq!(select_track(&tracks), Some(&tracks[3]));

        let tracks = vec![track("de", None), track("en-IN", None), track("en-GB", None)];
        assert_eq!(select_track(&tracks), Some(&tracks[2]));

        let tracks = vec![track("de", None), track("en-IN", None)];
        assert_eq!(select_track(&tracks), Some(&tracks[1]));

        let tracks = vec![track("de", None), track("fr", Some("asr"))];
        assert_eq!(select_track(&tracks), Some(&tracks[0]));

        assert_eq!(select_track(&[]), None);
    }

    #[test]
    fn test_player_response_patterns() {
        let player = json!({"videoDetails": {"title": "a } tricky { title"}});
        let page = page_with_player(&player);
        assert_eq!(extract_player_response(&page).unwrap(), player);

        let page = r#"<script>window["ytInitialPlayerResponse"] = {"ok": true};</script>"#;
        assert_eq!(extract_player_response(page).unwrap(), json!({"ok": true}));

        assert!(matches!(
            extract_player_response("<html></html>"),
            Err(TranscriptError::SourceUnavailable(ref m)) if m.contains("not found")
        ));
        assert!(matches!(
            extract_player_response("ytInitialPlayerResponse = {broken: ;}"),
            Err(TranscriptError::SourceUnavailable(ref m)) if m.contains("not valid JSON")
        ));
    }

    #[test]
    fn test_caption_tracks_alternate_path() {
        let player = json!({"playerCaptionsTracklistRenderer": {"captionTracks": [
            {"baseUrl": "https://x/timedtext?v=1", "languageCode": "en"},
            {"languageCode": "fr"}
        ]}});
        let tracks = caption_tracks(&player);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code.as_deref(), Some("en"));
    }

    #[test]
    fn test_track_urls_replace_fmt() {
        let src = source(Arc::new(ScriptedFetcher::new()));
        let urls = src.track_urls("/api/timedtext?v=abc123&fmt=srv3&lang=en").unwrap();
        assert_eq!(urls[0], "https://www.youtube.com/api/timedtext?v=abc123&fmt=srv3&lang=en");
        assert_eq!(urls[1], "https://www.youtube.com/api/timedtext?v=abc123&lang=en&fmt=json3");
    }

    #[tokio::test]
    async fn test_scrape_selects_track_and_falls_back_to_format_override() {
        let player = json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://www.youtube.com/api/timedtext?v=abc123&lang=de", "languageCode": "de"},
                {"baseUrl": "https://www.youtube.com/api/timedtext?v=abc123&lang=en", "languageCode": "en", "kind": "asr"}
            ]}}
        });
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond(WATCH_URL, 200, &page_with_player(&player))
                .respond("https://www.youtube.com/api/timedtext?v=abc123&lang=en", 200, "  ")
                .respond(
                    "https://www.youtube.com/api/timedtext?v=abc123&lang=en&fmt=json3",
                    200,
                    r#"{"events":[{"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"english"}]}]}"#,
                ),
        );
        let src = source(fetcher.clone());

        match src.acquire(&AcquisitionContext::new("abc123")).await {
            AcquisitionResult::Found(segments) => assert_eq!(segments[0].text(), "english"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fetcher.requested().len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_page_fails_fast() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond(
            WATCH_URL,
            200,
            "<html>This video is private<script>var ytInitialPlayerResponse = {};</script></html>",
        ));
        let src = source(fetcher.clone());

        match src.acquire(&AcquisitionContext::new("abc123")).await {
            AcquisitionResult::Failed(reason) => assert!(reason.contains("This video is private")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fetcher.requested(), vec![WATCH_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_login_required_status_fails() {
        let player = json!({"playabilityStatus": {"status": "LOGIN_REQUIRED"}});
        let fetcher = Arc::new(ScriptedFetcher::new().respond(WATCH_URL, 200, &page_with_player(&player)));

        match source(fetcher).acquire(&AcquisitionContext::new("abc123")).await {
            AcquisitionResult::Failed(reason) => assert!(reason.contains("LOGIN_REQUIRED")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_tracks_reports_reason() {
        let player = json!({"playabilityStatus": {"status": "OK"}});
        let fetcher = Arc::new(ScriptedFetcher::new().respond(WATCH_URL, 200, &page_with_player(&player)));

        match source(fetcher).acquire(&AcquisitionContext::new("abc123")).await {
            AcquisitionResult::Failed(reason) => assert!(reason.contains("no caption tracks")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_page_markup_is_not_taken_for_captions() {
        let player = json!({"playabilityStatus": {"status": "OK"}});
        let page = format!(
            "<html><body><svg><text x=\"1\">Subscribe now</text></svg>{}</body></html>",
            page_with_player(&player)
        );
        let fetcher = Arc::new(ScriptedFetcher::new().respond(WATCH_URL, 200, &page));

        assert_eq!(
            source(fetcher).acquire(&AcquisitionContext::new("abc123")).await,
            AcquisitionResult::Failed("no caption tracks in player response".to_string())
        );
    }
}
