//! Default configuration constants for scribeq.
//!
//! Shared constants used across configuration types to ensure consistency
//! and eliminate duplication.

/// Default upload ceiling for one audio chunk, in bytes.
///
/// 24 MiB leaves headroom under the 25 MB upload limit common to hosted
/// transcription APIs.
pub const MAX_CHUNK_BYTES: u64 = 24 * 1024 * 1024;

/// Fraction of the byte ceiling the segmenter aims for on its first trial.
///
/// The 10% margin absorbs encoding overhead and variable bitrate so the
/// first trial encode usually lands under the ceiling.
pub const SIZE_SAFETY_MARGIN: f64 = 0.9;

/// Step by which the segmenter greedily extends a fitting chunk, in seconds.
pub const EXTENSION_STEP_SECS: f64 = 60.0;

/// Minimum chunk duration in seconds.
///
/// A trailing remainder shorter than this is merged into the previous chunk
/// instead of being emitted on its own.
pub const MIN_CHUNK_SECS: f64 = 30.0;

/// Default job queue capacity.
///
/// When full, `enqueue` rejects immediately; this is the backpressure
/// signal the submission path uses to refuse new work under load.
pub const QUEUE_CAPACITY: usize = 150;

/// Default number of jobs executing concurrently across the worker pool.
pub const MAX_CONCURRENT_JOBS: usize = 6;

/// Default retry budget per job for transient failures.
pub const MAX_RETRIES: u32 = 3;

/// Default number of concurrent chunk transcriptions within one job.
pub const CHUNK_CONCURRENCY: usize = 4;

/// How long a worker waits on the queue before re-checking for shutdown,
/// in milliseconds.
pub const DEQUEUE_POLL_MS: u64 = 1000;

/// Minimum duration forced onto a segment whose range collapses during
/// overlap repair, in seconds.
pub const MIN_SEGMENT_SECS: f64 = 1.0;
