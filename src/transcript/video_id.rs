/// Video identifier extraction from the URL shapes YouTube hands out
use crate::error::{Result, TranscriptError};
use once_cell::sync::Lazy;
use regex::Regex;

/// URL shapes, tried in order; the first capture group is the identifier
static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"youtube\.com/watch\?(?:[^#\n]*?&)??v=([^&\n?#]+)",
        r"youtu\.be/([^&\n?#]+)",
        r"youtube\.com/embed/([^&\n?#]+)",
        r"youtube\.com/v/([^&\n?#]+)",
        r"youtube\.com/shorts/([^&\n?#]+)",
        r"youtube\.com/live/([^&\n?#]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static BARE_VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,}$").expect("valid bare id regex"));

/// Extract the video identifier from a YouTube URL
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS.iter().find_map(|re| {
        re.captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('/').to_string())
            .filter(|id| !id.is_empty())
    })
}

/// Accept either a URL or a bare identifier
pub fn resolve_video_id(input: &str) -> Result<String> {
    let input = input.trim();

    if let Some(id) = extract_video_id(input) {
        return Ok(id);
    }

    if BARE_VIDEO_ID.is_match(input) {
        return Ok(input.to_string());
    }

    Err(TranscriptError::InvalidInput(format!(
        "not a recognizable YouTube URL or video id: {}",
        input
    )))
}
