use super::{CaptionFormat, FormatParser};
use crate::transcript::Segment;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Top-level timed-text JSON document
#[derive(Debug, Deserialize)]
struct TimedTextDocument {
    #[serde(default)]
    events: Vec<Value>,
}

/// One caption event; every field is optional upstream
#[derive(Debug, Default, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: Option<f64>,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: Option<f64>,
    #[serde(default)]
    segs: Option<Vec<TimedTextSeg>>,
}

#[derive(Debug, Default, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: Option<String>,
}

/// Parser for `{"events": [...]}` payloads with millisecond timing
#[derive(Debug, Clone, Copy, Default)]
pub struct EventJsonParser;

impl FormatParser for EventJsonParser {
    fn format(&self) -> CaptionFormat {
        CaptionFormat::Json3
    }

    fn parse(&self, input: &str) -> Vec<Segment> {
        let document: TimedTextDocument = match serde_json::from_str(input.trim_start_matches('\u{FEFF}')) {
            Ok(doc) => doc,
            Err(e) => {
                debug!("Not timed-text JSON: {}", e);
                return Vec::new();
            }
        };

        document
            .events
            .into_iter()
            // Events that don't match the expected shape are skipped, not fatal
            .filter_map(|raw| serde_json::from_value::<TimedTextEvent>(raw).ok())
            .filter_map(|event| {
                let text: String = event
                    .segs
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|seg| seg.utf8)
                    .collect();
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

                let start = event.start_ms.unwrap_or(0.0) / 1000.0;
                let duration = event.duration_ms.unwrap_or(0.0) / 1000.0;
                Segment::new(text, start, duration)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_become_segments_in_order() {
        let input = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 1500, "segs": [{"utf8": "Hello"}, {"utf8": " world"}]},
                {"tStartMs": 1500, "dDurationMs": 2000, "segs": [{"utf8": "second"}]},
                {"tStartMs": 4000, "dDurationMs": 500, "segs": [{"utf8": "third"}]}
            ]
        }"#;

        let segments = EventJsonParser.parse(input);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text(), "Hello world");
        assert_eq!(segments[0].start(), 0.0);
        assert_eq!(segments[0].end(), 1.5);
        assert_eq!(segments[1].start(), 1.5);
        assert_eq!(segments[1].end(), 3.5);
        assert_eq!(segments[2].text(), "third");
        assert_eq!(segments[2].end(), 4.5);
    }

    #[test]
    fn test_missing_timing_defaults_to_zero_and_empty_events_drop() {
        let input = r#"{"events": [
            {"segs": [{"utf8": "no timing"}]},
            {"tStartMs": 100, "dDurationMs": 200},
            {"tStartMs": 200, "segs": [{"utf8": "\n"}]},
            {"tStartMs": 300, "segs": [{"acAsrConf": 0}]}
        ]}"#;

        let segments = EventJsonParser.parse(input);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text(), "no timing");
        assert_eq!(segments[0].start(), 0.0);
        assert_eq!(segments[0].duration(), 0.0);
    }

    #[test]
    fn test_malformed_events_are_skipped() {
        let input = r#"{"events": [
            "garbage",
            {"tStartMs": "not a number", "segs": [{"utf8": "bad timing"}]},
            {"tStartMs": 2000, "dDurationMs": 1000, "segs": [{"utf8": "ok"}]}
        ]}"#;

        let segments = EventJsonParser.parse(input);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text(), "ok");
        assert_eq!(segments[0].start(), 2.0);
    }

    #[test]
    fn test_invalid_json_is_empty() {
        assert!(EventJsonParser.parse("{not json").is_empty());
        assert!(EventJsonParser.parse("<transcript/>").is_empty());
        assert!(EventJsonParser.parse(r#"{"other": 1}"#).is_empty());
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let input = r#"{"events": [{"tStartMs": 10, "dDurationMs": 20, "segs": [{"utf8": "x"}]}]}"#;
        assert_eq!(EventJsonParser.parse(input), EventJsonParser.parse(input));
    }
}
