use super::{clean_caption_text, CaptionFormat, EventJsonParser, FormatParser};
use crate::transcript::Segment;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

static TEXT_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<text[\s>/]").expect("valid open tag regex"));
static TEXT_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</text\s*>").expect("valid close tag regex"));
static TEXT_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("valid span regex"));
static TEXT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("text").expect("valid text selector"));

/// Parser for `<text start=".." dur="..">` cue XML
///
/// When the document is malformed or holds no `text` elements the parser
/// tries the payload as timed-text JSON, then falls back to pulling
/// `<text>` spans out with a regex and giving each a synthetic time slot.
#[derive(Debug, Clone)]
pub struct XmlCueParser {
    fallback_slot_seconds: f64,
}

impl XmlCueParser {
    pub fn new(fallback_slot_seconds: f64) -> Self {
        Self {
            fallback_slot_seconds,
        }
    }

    /// Strict path: returns `None` when the payload can't be treated as cue XML
    fn parse_document(&self, input: &str) -> Option<Vec<Segment>> {
        let opens = TEXT_OPEN_RE.find_iter(input).count();
        let closes = TEXT_CLOSE_RE.find_iter(input).count();
        if opens != closes {
            debug!("Malformed cue XML: {} <text> tags vs {} </text> tags", opens, closes);
            return None;
        }

        let document = Html::parse_fragment(input);
        let elements: Vec<_> = document.select(&TEXT_SELECTOR).collect();
        if elements.is_empty() {
            return None;
        }

        let segments = elements
            .into_iter()
            .filter_map(|element| {
                let raw: String = element.text().collect();
                let start = parse_seconds(element.value().attr("start"));
                let duration = parse_seconds(element.value().attr("dur"));
                Segment::new(clean_caption_text(&raw), start, duration)
            })
            .collect();

        Some(segments)
    }

    /// Last-resort recovery of `<text>` spans without timing
    fn parse_spans(&self, input: &str) -> Vec<Segment> {
        let slot = self.fallback_slot_seconds;
        TEXT_SPAN_RE
            .captures_iter(input)
            .enumerate()
            .filter_map(|(index, caps)| {
                let raw = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                Segment::new(clean_caption_text(raw), index as f64 * slot, slot)
            })
            .collect()
    }
}

impl Default for XmlCueParser {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl FormatParser for XmlCueParser {
    fn format(&self) -> CaptionFormat {
        CaptionFormat::Xml
    }

    fn parse(&self, input: &str) -> Vec<Segment> {
        if let Some(segments) = self.parse_document(input) {
            return segments;
        }

        let segments = EventJsonParser.parse(input);
        if !segments.is_empty() {
            debug!("Recovered {} segments from cue XML payload as JSON", segments.len());
            return segments;
        }

        let segments = self.parse_spans(input);
        if !segments.is_empty() {
            debug!("Recovered {} segments from <text> spans", segments.len());
        }
        segments
    }
}

/// Parse a seconds attribute, defaulting to 0 and rounding to two decimals
fn parse_seconds(value: Option<&str>) -> f64 {
    let parsed = value
        .unwrap_or("0")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);
    (parsed * 100.0).round() / 100.0
}
