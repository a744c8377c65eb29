/// Transcript data model shared by every parser and source
///
/// A `Segment` is one normalized caption cue. Parsers and sources only ever
/// produce segments through `Segment::new`, so a segment with blank text
/// never exists and `end` always equals `start + duration`.

pub mod video_id;

pub use video_id::{extract_video_id, resolve_video_id};

use serde::{Deserialize, Serialize};

/// One caption cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SegmentRecord")]
pub struct Segment {
    text: String,
    start: f64,
    duration: f64,
    end: f64,
}

/// Wire shape used when deserializing; any supplied `end` is ignored
#[derive(Deserialize)]
struct SegmentRecord {
    text: String,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    duration: f64,
}

impl From<SegmentRecord> for Segment {
    fn from(record: SegmentRecord) -> Self {
        let start = clamp_start(record.start);
        let duration = finite_or_zero(record.duration);
        Self {
            text: record.text.trim().to_string(),
            start,
            duration,
            end: start + duration,
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn clamp_start(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}

impl Segment {
    /// Create a segment, returning `None` when the trimmed text is empty
    pub fn new(text: impl AsRef<str>, start: f64, duration: f64) -> Option<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return None;
        }

        let start = clamp_start(start);
        let duration = finite_or_zero(duration);
        Some(Self {
            text: text.to_string(),
            start,
            duration,
            end: start + duration,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn set_start(&mut self, start: f64) {
        self.start = clamp_start(start);
        self.end = self.start + self.duration;
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = finite_or_zero(duration);
        self.end = self.start + self.duration;
    }
}

/// Ordered segments as delivered by a source
pub type Transcript = Vec<Segment>;

/// Flattened view of a transcript for the summarizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledTranscript {
    /// Video the transcript belongs to
    pub video_id: String,
    /// Name of the source that produced the transcript
    pub source: String,
    /// Segment texts joined by single spaces
    pub full_text: String,
    /// End time of the last segment in seconds
    pub duration_seconds: f64,
    /// Number of segments assembled
    pub segment_count: usize,
}

/// Join segment text and take the duration from the last segment
pub fn assemble(transcript: &[Segment]) -> AssembledTranscript {
    let full_text = transcript
        .iter()
        .map(|segment| segment.text())
        .collect::<Vec<_>>()
        .join(" ");

    AssembledTranscript {
        video_id: String::new(),
        source: String::new(),
        full_text,
        duration_seconds: transcript.last().map(|s| s.end()).unwrap_or(0.0),
        segment_count: transcript.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_segment_is_never_created() {
        assert!(Segment::new("   ", 1.0, 2.0).is_none());
        assert!(Segment::new("", 0.0, 0.0).is_none());
    }

    #[test]
    fn test_segment_end_follows_setters() {
        let mut segment = Segment::new("  hello ", 1.5, 2.0).unwrap();
        assert_eq!(segment.text(), "hello");
        assert_eq!(segment.end(), 3.5);

        segment.set_start(10.0);
        assert_eq!(segment.end(), 12.0);

        segment.set_duration(0.5);
        assert_eq!(segment.end(), 10.5);
    }

    #[test]
    fn test_negative_start_is_clamped() {
        let segment = Segment::new("x", -4.0, 1.0).unwrap();
        assert_eq!(segment.start(), 0.0);
        assert_eq!(segment.end(), 1.0);
    }

    #[test]
    fn test_deserialize_recomputes_end() {
        let segment: Segment =
            serde_json::from_str(r#"{"text":"hi","start":2.0,"duration":3.0,"end":99.0}"#).unwrap();
        assert_eq!(segment.end(), 5.0);
    }

    #[test]
    fn test_assemble_three_segments() {
        let transcript = vec![
            Segment::new("a", 0.0, 2.0).unwrap(),
            Segment::new("b", 5.0, 2.0).unwrap(),
            Segment::new("c", 10.0, 2.0).unwrap(),
        ];

        let assembled = assemble(&transcript);
        assert_eq!(assembled.full_text, "a b c");
        assert_eq!(assembled.duration_seconds, 12.0);
        assert_eq!(assembled.segment_count, 3);
    }

    #[test]
    fn test_assemble_empty() {
        let assembled = assemble(&[]);
        assert_eq!(assembled.full_text, "");
        assert_eq!(assembled.duration_seconds, 0.0);
    }
}
