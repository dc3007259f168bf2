//! Timestamped transcript segments and aggregates.

use serde::{Deserialize, Serialize};

/// One utterance with a time range and text.
///
/// Times are seconds. Before reconciliation they are chunk-local; after
/// reconciliation they are global-timeline values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds, >= start.
    pub end: f64,
    /// Recognized (or revised) text.
    pub text: String,
    /// 1-based index of the chunk this segment came from.
    pub chunk_index: usize,
}

impl TimestampedSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            chunk_index,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when the text is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Aggregate transcription result, per chunk or combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOutput {
    /// Segment texts joined in order.
    pub text: String,
    pub segments: Vec<TimestampedSegment>,
    /// Detected language code, "unknown" when not reported.
    pub language: String,
    /// Total audio duration in seconds.
    pub duration: f64,
}

impl TranscriptionOutput {
    /// Build an output whose full text is the segments' text joined in order.
    pub fn from_segments(
        segments: Vec<TimestampedSegment>,
        language: impl Into<String>,
        duration: f64,
    ) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            text,
            segments,
            language: language.into(),
            duration,
        }
    }

    pub fn empty(duration: f64) -> Self {
        Self {
            text: String::new(),
            segments: Vec::new(),
            language: "unknown".to_string(),
            duration,
        }
    }

    /// True when the full text is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One chunk's transcription plus where that chunk starts in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTranscription {
    /// 1-based chunk index.
    pub chunk_index: usize,
    /// Chunk start offset in the source timeline, seconds.
    pub start_offset: f64,
    /// Chunk-local transcription result.
    pub output: TranscriptionOutput,
}

/// Format seconds as `HH:MM:SS.mmm` for human-facing output.
///
/// Hours may exceed 24; negative values clamp to zero.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_zero() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
    }

    #[test]
    fn test_format_timestamp_subsecond() {
        assert_eq!(format_timestamp(0.5), "00:00:00.500");
        assert_eq!(format_timestamp(0.001), "00:00:00.001");
    }

    #[test]
    fn test_format_timestamp_minutes_and_hours() {
        assert_eq!(format_timestamp(65.25), "00:01:05.250");
        assert_eq!(format_timestamp(3661.5), "01:01:01.500");
    }

    #[test]
    fn test_format_timestamp_hours_exceed_24() {
        assert_eq!(format_timestamp(90_000.0), "25:00:00.000");
    }

    #[test]
    fn test_format_timestamp_negative_clamps_to_zero() {
        assert_eq!(format_timestamp(-3.0), "00:00:00.000");
    }

    #[test]
    fn test_format_timestamp_rounds_to_millis() {
        assert_eq!(format_timestamp(1.9996), "00:00:02.000");
    }

    #[test]
    fn test_segment_duration() {
        let seg = TimestampedSegment::new(2.0, 5.5, "hi", 1);
        assert_eq!(seg.duration(), 3.5);
    }

    #[test]
    fn test_segment_is_blank() {
        assert!(TimestampedSegment::new(0.0, 1.0, "   ", 1).is_blank());
        assert!(!TimestampedSegment::new(0.0, 1.0, "word", 1).is_blank());
    }

    #[test]
    fn test_output_from_segments_joins_text() {
        let output = TranscriptionOutput::from_segments(
            vec![
                TimestampedSegment::new(0.0, 1.0, " hello ", 1),
                TimestampedSegment::new(1.0, 2.0, "", 1),
                TimestampedSegment::new(2.0, 3.0, "world", 1),
            ],
            "en",
            3.0,
        );
        assert_eq!(output.text, "hello world");
        assert_eq!(output.segments.len(), 3);
        assert_eq!(output.language, "en");
    }

    #[test]
    fn test_output_blank_detection() {
        assert!(TranscriptionOutput::empty(10.0).is_blank());
        let output = TranscriptionOutput::from_segments(
            vec![TimestampedSegment::new(0.0, 1.0, "a", 1)],
            "en",
            1.0,
        );
        assert!(!output.is_blank());
    }

    #[test]
    fn test_segment_serializes_to_json() {
        let seg = TimestampedSegment::new(1.0, 2.0, "hey", 2);
        let json = serde_json::to_string(&seg).unwrap();
        let back: TimestampedSegment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seg);
    }
}
