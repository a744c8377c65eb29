/// Caption format parsers
///
/// Every parser turns one concrete payload format into segments and never
/// fails: malformed input produces an empty vector. `CaptionParser` picks the
/// parser from a source-supplied hint or by sniffing the payload.

pub mod embedded;
pub mod json3;
pub mod webvtt;
pub mod xml;

pub use embedded::EmbeddedJsonParser;
pub use json3::EventJsonParser;
pub use webvtt::WebVttParser;
pub use xml::XmlCueParser;

use crate::config::ParsingConfig;
use crate::transcript::Segment;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Payload formats the parsers understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionFormat {
    /// `{"events": [...]}` timed-text JSON (`fmt=json3`)
    Json3,
    /// `<text start dur>` cue XML (`fmt=srv1`/`srv3` and the default track format)
    Xml,
    /// WebVTT cue blocks
    WebVtt,
    /// Transcript JSON embedded in a rendered HTML page
    EmbeddedHtml,
}

impl CaptionFormat {
    /// Map a caption endpoint `fmt` query value to the format it returns
    pub fn from_fmt_param(fmt: &str) -> Self {
        match fmt.to_ascii_lowercase().as_str() {
            "json3" => CaptionFormat::Json3,
            "vtt" | "webvtt" => CaptionFormat::WebVtt,
            _ => CaptionFormat::Xml,
        }
    }
}

impl fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptionFormat::Json3 => "json3",
            CaptionFormat::Xml => "xml",
            CaptionFormat::WebVtt => "vtt",
            CaptionFormat::EmbeddedHtml => "html",
        };
        f.write_str(name)
    }
}

impl FromStr for CaptionFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "json3" => Ok(CaptionFormat::Json3),
            "xml" | "srv1" | "srv3" => Ok(CaptionFormat::Xml),
            "vtt" | "webvtt" => Ok(CaptionFormat::WebVtt),
            "html" => Ok(CaptionFormat::EmbeddedHtml),
            other => Err(format!("unknown caption format: {}", other)),
        }
    }
}

/// A parser for one caption payload format
pub trait FormatParser: Send + Sync {
    fn format(&self) -> CaptionFormat;

    /// Parse a payload; malformed input yields an empty vector
    fn parse(&self, input: &str) -> Vec<Segment>;
}

/// Guess the payload format from its content
pub fn sniff_format(input: &str) -> Option<CaptionFormat> {
    let trimmed = input.trim_start_matches('\u{FEFF}').trim_start();

    if trimmed.starts_with('{') && trimmed.contains("\"events\"") {
        Some(CaptionFormat::Json3)
    } else if trimmed.contains("<text") {
        Some(CaptionFormat::Xml)
    } else if trimmed.contains("WEBVTT") {
        Some(CaptionFormat::WebVtt)
    } else {
        None
    }
}

/// Format-dispatching front end over the individual parsers
#[derive(Debug, Clone)]
pub struct CaptionParser {
    json: EventJsonParser,
    xml: XmlCueParser,
    vtt: WebVttParser,
    embedded: EmbeddedJsonParser,
}

impl CaptionParser {
    pub fn new(config: &ParsingConfig) -> Self {
        Self {
            json: EventJsonParser,
            xml: XmlCueParser::new(config.fallback_slot_seconds),
            vtt: WebVttParser,
            embedded: EmbeddedJsonParser::new(
                config.embedded_min_segments,
                config.boilerplate_phrases.clone(),
            ),
        }
    }

    pub fn parser_for(&self, format: CaptionFormat) -> &dyn FormatParser {
        match format {
            CaptionFormat::Json3 => &self.json,
            CaptionFormat::Xml => &self.xml,
            CaptionFormat::WebVtt => &self.vtt,
            CaptionFormat::EmbeddedHtml => &self.embedded,
        }
    }

    /// Parse with the hinted format, falling back to the sniffed one.
    /// Unrecognized content goes to the cue XML parser, whose permissive
    /// recovery path is the last resort.
    pub fn parse(&self, input: &str, hint: Option<CaptionFormat>) -> Vec<Segment> {
        let sniffed = sniff_format(input).unwrap_or(CaptionFormat::Xml);

        if let Some(format) = hint {
            let segments = self.parser_for(format).parse(input);
            if !segments.is_empty() || format == sniffed {
                return segments;
            }
            debug!("Hinted format {} produced nothing, trying sniffed {}", format, sniffed);
        }

        self.parser_for(sniffed).parse(input)
    }
}

impl Default for CaptionParser {
    fn default() -> Self {
        Self::new(&ParsingConfig::default())
    }
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Remove markup tags, leaving their text content
pub fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, "").into_owned()
}

/// Decode HTML entities and drop markup by running the text through the HTML parser
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') && !input.contains('<') {
        return input.to_string();
    }
    let fragment = Html::parse_fragment(input);
    fragment.root_element().text().collect()
}

/// Normalize raw cue text: decode entities, strip tags, collapse whitespace
pub fn clean_caption_text(input: &str) -> String {
    let decoded = decode_entities(input);
    let stripped = strip_tags(&decoded);
    WHITESPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_format() {
        assert_eq!(sniff_format(r#"{"events":[]}"#), Some(CaptionFormat::Json3));
        assert_eq!(
            sniff_format(r#"<?xml version="1.0"?><transcript><text start="0">hi</text></transcript>"#),
            Some(CaptionFormat::Xml)
        );
        assert_eq!(sniff_format("WEBVTT\n\n00:00.000 --> 00:01.000\nhi"), Some(CaptionFormat::WebVtt));
        assert_eq!(sniff_format("plain words"), None);
        // JSON without an events key is not timed-text JSON
        assert_eq!(sniff_format(r#"{"foo":1}"#), None);
    }

    #[test]
    fn test_clean_caption_text() {
        assert_eq!(clean_caption_text("it&#39;s <b>bold</b>  \n now"), "it's bold now");
        assert_eq!(clean_caption_text("Tom &amp;amp; Jerry"), "Tom &amp; Jerry");
        assert_eq!(clean_caption_text("a < b"), "a < b");
    }

    #[test]
    fn test_hint_is_preferred_then_sniffed() {
        let parser = CaptionParser::default();
        let json = r#"{"events":[{"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"hello"}]}]}"#;

        // A wrong hint still recovers through sniffing
        let segments = parser.parse(json, Some(CaptionFormat::WebVtt));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text(), "hello");

        let segments = parser.parse(json, None);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_unrecognized_content_yields_nothing() {
        let parser = CaptionParser::default();
        assert!(parser.parse("<html><body>nothing here</body></html>", None).is_empty());
        assert!(parser.parse("", None).is_empty());
    }

    #[test]
    fn test_format_names() {
        assert_eq!("vtt".parse::<CaptionFormat>().unwrap(), CaptionFormat::WebVtt);
        assert_eq!("json".parse::<CaptionFormat>().unwrap(), CaptionFormat::Json3);
        assert!("srt".parse::<CaptionFormat>().is_err());
        assert_eq!(CaptionFormat::from_fmt_param("srv3"), CaptionFormat::Xml);
        assert_eq!(CaptionFormat::from_fmt_param("vtt"), CaptionFormat::WebVtt);
    }
}
