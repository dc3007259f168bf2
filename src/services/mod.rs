//! External capability seams: transcription, revision, media acquisition
//! and transcript persistence. Each trait ships with a mock used across
//! the test suites.

pub mod fetcher;
pub mod reviser;
pub mod sink;
pub mod transcriber;

pub use fetcher::{MediaFetcher, MockFetcher};
pub use reviser::{MockReviser, Reviser};
pub use sink::{FileSink, MemorySink, TranscriptSink};
pub use transcriber::{MockTranscriber, Transcriber};
