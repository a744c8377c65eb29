/// Transcript JSON embedded in rendered YouTube markup
///
/// The page as a whole is not JSON, so each known structure is located by an
/// anchor pattern and only the bracketed value after the anchor is parsed.
/// The patterns form a ranked list; the first one whose extracted segments
/// clear the minimum yield wins.
use super::{clean_caption_text, CaptionFormat, FormatParser};
use crate::transcript::Segment;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Millisecond values arrive as either JSON numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Millis {
    Number(f64),
    Text(String),
}

impl Millis {
    fn seconds(&self) -> Option<f64> {
        let ms = match self {
            Millis::Number(n) => Some(*n),
            Millis::Text(s) => s.trim().parse::<f64>().ok(),
        }?;
        ms.is_finite().then_some(ms / 1000.0)
    }
}

/// `{"simpleText": ".."}` or `{"runs": [{"text": ".."}]}`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FormattedText {
    #[serde(default)]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TextRun {
    #[serde(default)]
    text: Option<String>,
}

impl FormattedText {
    fn flatten(&self) -> String {
        match &self.simple_text {
            Some(text) => text.clone(),
            None => self.runs.iter().filter_map(|r| r.text.as_deref()).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CueGroup {
    #[serde(default)]
    transcript_cue_group_renderer: Option<CueGroupRenderer>,
}

#[derive(Debug, Default, Deserialize)]
struct CueGroupRenderer {
    #[serde(default)]
    cues: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CueEntry {
    #[serde(default)]
    transcript_cue_renderer: Option<CueRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CueRenderer {
    #[serde(default)]
    cue: Option<FormattedText>,
    #[serde(default)]
    start_offset_ms: Option<Millis>,
    #[serde(default)]
    duration_ms: Option<Millis>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentEntry {
    #[serde(default)]
    transcript_segment_renderer: Option<SegmentRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentRenderer {
    #[serde(default)]
    snippet: Option<FormattedText>,
    #[serde(default)]
    start_ms: Option<Millis>,
    #[serde(default)]
    end_ms: Option<Millis>,
}

/// Convert an engagement-panel `cueGroups` array into segments.
/// Entries that don't have the expected shape are skipped.
pub(crate) fn segments_from_cue_groups(groups: &Value) -> Vec<Segment> {
    let Some(groups) = groups.as_array() else {
        return Vec::new();
    };

    groups
        .iter()
        .filter_map(|group| serde_json::from_value::<CueGroup>(group.clone()).ok())
        .filter_map(|group| group.transcript_cue_group_renderer)
        .flat_map(|renderer| renderer.cues)
        .filter_map(|cue| serde_json::from_value::<CueEntry>(cue).ok())
        .filter_map(|entry| entry.transcript_cue_renderer)
        .filter_map(|cue| {
            let text = clean_caption_text(&cue.cue.as_ref().map(|c| c.flatten()).unwrap_or_default());
            let start = cue.start_offset_ms.as_ref().and_then(Millis::seconds).unwrap_or(0.0);
            let duration = cue.duration_ms.as_ref().and_then(Millis::seconds).unwrap_or(0.0);
            Segment::new(text, start, duration)
        })
        .collect()
}

/// Convert a `transcriptSegmentListRenderer.initialSegments` array into segments
pub(crate) fn segments_from_segment_list(segments: &Value) -> Vec<Segment> {
    let Some(segments) = segments.as_array() else {
        return Vec::new();
    };

    segments
        .iter()
        .filter_map(|entry| serde_json::from_value::<SegmentEntry>(entry.clone()).ok())
        .filter_map(|entry| entry.transcript_segment_renderer)
        .filter_map(|renderer| {
            let text = clean_caption_text(
                &renderer.snippet.as_ref().map(|s| s.flatten()).unwrap_or_default(),
            );
            let start = renderer.start_ms.as_ref().and_then(Millis::seconds).unwrap_or(0.0);
            let end = renderer.end_ms.as_ref().and_then(Millis::seconds).unwrap_or(start);
            Segment::new(text, start, (end - start).max(0.0))
        })
        .collect()
}

/// Return the bracketed JSON value (`{..}` or `[..]`) starting at `open`,
/// honouring string literals and escapes
pub fn extract_balanced(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let (opener, closer) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[open..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b if b == opener => depth += 1,
            b if b == closer => {
                depth -= 1;
                if depth == 0 {
                    return text.get(open..=open + offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// One ranked (pattern, extractor) pair
pub struct EmbeddedPattern {
    pub name: &'static str,
    anchor: Regex,
    extract: fn(&Value) -> Vec<Segment>,
}

impl EmbeddedPattern {
    /// Try every anchor occurrence, returning the first non-empty extraction
    pub fn apply(&self, markup: &str) -> Vec<Segment> {
        for found in self.anchor.find_iter(markup) {
            // The anchor ends on the opening bracket
            let open = found.end() - 1;
            let Some(fragment) = extract_balanced(markup, open) else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(fragment) else {
                continue;
            };
            let segments = (self.extract)(&value);
            if !segments.is_empty() {
                return segments;
            }
        }
        Vec::new()
    }
}

fn extract_engagement_panel(body: &Value) -> Vec<Segment> {
    segments_from_cue_groups(body.get("cueGroups").unwrap_or(&Value::Null))
}

fn extract_segment_list(list: &Value) -> Vec<Segment> {
    segments_from_segment_list(list.get("initialSegments").unwrap_or(&Value::Null))
}

/// Known embedded structures, most specific first
pub static EMBEDDED_PATTERNS: Lazy<Vec<EmbeddedPattern>> = Lazy::new(|| {
    vec![
        EmbeddedPattern {
            name: "engagement_panel",
            anchor: Regex::new(r#""transcriptBodyRenderer"\s*:\s*\{"#).expect("valid anchor regex"),
            extract: extract_engagement_panel,
        },
        EmbeddedPattern {
            name: "segment_list",
            anchor: Regex::new(r#""transcriptSegmentListRenderer"\s*:\s*\{"#)
                .expect("valid anchor regex"),
            extract: extract_segment_list,
        },
    ]
});

/// Best-effort parser for transcript JSON inside page markup
#[derive(Debug, Clone)]
pub struct EmbeddedJsonParser {
    min_segments: usize,
    boilerplate_phrases: Vec<String>,
}

impl EmbeddedJsonParser {
    pub fn new(min_segments: usize, boilerplate_phrases: Vec<String>) -> Self {
        Self {
            min_segments,
            boilerplate_phrases: boilerplate_phrases
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    fn is_boilerplate(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.boilerplate_phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

impl Default for EmbeddedJsonParser {
    fn default() -> Self {
        Self::new(5, crate::config::ParsingConfig::default().boilerplate_phrases)
    }
}

impl FormatParser for EmbeddedJsonParser {
    fn format(&self) -> CaptionFormat {
        CaptionFormat::EmbeddedHtml
    }

    fn parse(&self, input: &str) -> Vec<Segment> {
        for pattern in EMBEDDED_PATTERNS.iter() {
            let segments: Vec<Segment> = pattern
                .apply(input)
                .into_iter()
                .filter(|segment| !self.is_boilerplate(segment.text()))
                .collect();

            if segments.len() > self.min_segments {
                debug!("Embedded pattern {} yielded {} segments", pattern.name, segments.len());
                return segments;
            }
            if !segments.is_empty() {
                debug!(
                    "Embedded pattern {} yielded only {} segments, ignoring",
                    pattern.name,
                    segments.len()
                );
            }
        }
        Vec::new()
    }
}
