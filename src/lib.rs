//! scribeq - Job scheduling and chunk reconciliation for long-form
//! transcription.
//!
//! Splits oversized audio into byte-bounded chunks, fans them out to a
//! transcription backend, and stitches the per-chunk results back into
//! one coherent, monotonic transcript. Embedders submit jobs through
//! [`JobService`] and plug their backends in via the service traits.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod config;
pub mod defaults;
pub mod error;
pub mod job;
pub mod media;
pub mod pipeline;
pub mod services;
pub mod transcript;

// Core traits (acquire → transcribe → persist)
pub use media::codec::{AudioCodec, WavCodec};
pub use services::{MediaFetcher, Reviser, TranscriptSink, Transcriber};

// Scheduling
pub use job::{
    Job, JobId, JobKind, JobOptions, JobQueue, JobRequest, JobService, JobState, JobStore,
    MemoryJobStore, OutputFormat, WorkerPool, WorkerStats,
};
pub use pipeline::PipelineOrchestrator;

// Transcript model
pub use transcript::{
    ChunkTranscription, TimestampedSegment, TranscriptionOutput, format_timestamp,
};

// Error handling
pub use error::{Result, ScribeqError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
