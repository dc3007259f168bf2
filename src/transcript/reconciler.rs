//! Timestamp reconciliation: merge per-chunk segments into one globally
//! ordered, non-overlapping transcript.
//!
//! Chunk transcriptions carry chunk-local timestamps. Reconciliation
//! projects them onto the global timeline using each chunk's start offset,
//! sorts them, and repairs boundary overlaps in a single greedy pass.

use crate::defaults;
use crate::transcript::segment::{ChunkTranscription, TimestampedSegment, TranscriptionOutput};

/// Reconcile per-chunk results into one ordered, non-overlapping segment list.
///
/// Steps: drop blank segments, project chunk-local times onto the global
/// timeline, stable-sort by start (ties keep chunk/segment order), then run
/// one left-to-right overlap-repair pass. The repair is greedy and never
/// backtracks: an overlapping segment has its start pushed to the previous
/// segment's end, and a collapsed range is forced to a 1-second minimum.
pub fn reconcile(results: &[ChunkTranscription]) -> Vec<TimestampedSegment> {
    // Projection happens in chunk order so the stable sort's tie-break
    // preserves original chunk/segment order.
    let mut ordered: Vec<&ChunkTranscription> = results.iter().collect();
    ordered.sort_by_key(|r| r.chunk_index);

    let mut projected: Vec<TimestampedSegment> = Vec::new();
    for result in ordered {
        for segment in &result.output.segments {
            if segment.is_blank() {
                continue;
            }
            projected.push(TimestampedSegment {
                start: segment.start + result.start_offset,
                end: segment.end + result.start_offset,
                text: segment.text.clone(),
                chunk_index: result.chunk_index,
            });
        }
    }

    projected.sort_by(|a, b| a.start.total_cmp(&b.start));

    repair_overlaps(projected)
}

/// Single left-to-right overlap repair over sorted segments.
fn repair_overlaps(sorted: Vec<TimestampedSegment>) -> Vec<TimestampedSegment> {
    let mut repaired: Vec<TimestampedSegment> = Vec::with_capacity(sorted.len());

    for mut segment in sorted {
        if let Some(previous) = repaired.last() {
            if segment.start < previous.end {
                segment.start = previous.end;
                if segment.end <= segment.start {
                    segment.end = segment.start + defaults::MIN_SEGMENT_SECS;
                }
            }
        }
        repaired.push(segment);
    }

    repaired
}

/// Build the combined output from reconciled segments.
///
/// The full text is the segments' text joined in global order; the language
/// is taken from the first chunk that reported one; the duration is the sum
/// of chunk durations.
pub fn combine(
    results: &[ChunkTranscription],
    segments: Vec<TimestampedSegment>,
) -> TranscriptionOutput {
    let language = results
        .iter()
        .map(|r| r.output.language.as_str())
        .find(|l| !l.is_empty() && *l != "unknown")
        .unwrap_or("unknown")
        .to_string();
    let duration = results.iter().map(|r| r.output.duration).sum();
    TranscriptionOutput::from_segments(segments, language, duration)
}
