//! Transcript model and timeline reconciliation.

pub mod reconciler;
pub mod segment;

pub use reconciler::{combine, reconcile};
pub use segment::{ChunkTranscription, TimestampedSegment, TranscriptionOutput, format_timestamp};
