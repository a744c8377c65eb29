use super::{clean_caption_text, CaptionFormat, FormatParser};
use crate::transcript::Segment;
use once_cell::sync::Lazy;
use regex::Regex;

static TIMING_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\d+:)?\d{1,2}:\d{2}[.,]\d{3})\s*-->\s*((?:\d+:)?\d{1,2}:\d{2}[.,]\d{3})")
        .expect("valid VTT timing regex")
});

/// Line-oriented WebVTT parser
#[derive(Debug, Clone, Copy, Default)]
pub struct WebVttParser;

/// Cue being accumulated between a timing line and the next blank line
struct PendingCue {
    start: f64,
    end: f64,
    lines: Vec<String>,
}

impl PendingCue {
    fn finish(self) -> Option<Segment> {
        let text = self.lines.join(" ");
        Segment::new(text, self.start, (self.end - self.start).max(0.0))
    }
}

impl FormatParser for WebVttParser {
    fn format(&self) -> CaptionFormat {
        CaptionFormat::WebVtt
    }

    fn parse(&self, input: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut pending: Option<PendingCue> = None;

        for raw_line in input.lines() {
            let line = raw_line.trim_start_matches('\u{FEFF}').trim();

            if let Some(caps) = TIMING_LINE_RE.captures(line) {
                if let Some(segment) = pending.take().and_then(PendingCue::finish) {
                    segments.push(segment);
                }
                let start = caps.get(1).and_then(|m| parse_timestamp(m.as_str()));
                let end = caps.get(2).and_then(|m| parse_timestamp(m.as_str()));
                if let (Some(start), Some(end)) = (start, end) {
                    pending = Some(PendingCue {
                        start,
                        end,
                        lines: Vec::new(),
                    });
                }
                continue;
            }

            if line.is_empty() {
                if let Some(segment) = pending.take().and_then(PendingCue::finish) {
                    segments.push(segment);
                }
                continue;
            }

            if line.starts_with("WEBVTT") || line.starts_with("NOTE") {
                continue;
            }

            // Cue identifiers
            if line.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }

            if let Some(cue) = pending.as_mut() {
                let text = clean_caption_text(line);
                if !text.is_empty() {
                    cue.lines.push(text);
                }
            }
        }

        if let Some(segment) = pending.take().and_then(PendingCue::finish) {
            segments.push(segment);
        }

        segments
    }
}

/// Parse `H:MM:SS.mmm` or `MM:SS.mmm` into seconds
fn parse_timestamp(value: &str) -> Option<f64> {
    let value = value.replace(',', ".");
    let mut total = 0.0;
    for part in value.split(':') {
        total = total * 60.0 + part.parse::<f64>().ok()?;
    }
    Some(total)
}
