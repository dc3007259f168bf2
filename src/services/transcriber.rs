//! Transcription backend seam.

use crate::error::{Result, ScribeqError};
use crate::transcript::TranscriptionOutput;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Turns one audio file into text with segment timestamps.
///
/// Implementations wrap whatever backend does the actual recognition.
/// Failures map to `TranscriptionUnavailable` (backend unreachable or
/// over quota) or `TranscriptionTimeout`; both are retried by the worker.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &Path,
        source_language: Option<&str>,
    ) -> Result<TranscriptionOutput>;
}

/// Scripted transcriber for tests.
///
/// Returns queued outputs in order, falling back to an empty output once
/// the script runs dry. `failing_times(n)` makes the first n calls fail
/// with `TranscriptionUnavailable` before the script starts.
#[derive(Default)]
pub struct MockTranscriber {
    scripted: Mutex<VecDeque<TranscriptionOutput>>,
    fail_times: u32,
    calls: AtomicU32,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(self, output: TranscriptionOutput) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(output);
        self
    }

    pub fn failing_times(mut self, n: u32) -> Self {
        self.fail_times = n;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        _source_language: Option<&str>,
    ) -> Result<TranscriptionOutput> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            return Err(ScribeqError::TranscriptionUnavailable {
                message: format!("mock backend refused {}", audio_path.display()),
            });
        }
        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(scripted.unwrap_or_else(|| TranscriptionOutput::empty(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TimestampedSegment;

    #[tokio::test]
    async fn test_mock_returns_scripted_outputs_in_order() {
        let first = TranscriptionOutput::from_segments(
            vec![TimestampedSegment::new(0.0, 1.0, "one", 1)],
            "en",
            1.0,
        );
        let second = TranscriptionOutput::from_segments(
            vec![TimestampedSegment::new(0.0, 1.0, "two", 2)],
            "en",
            1.0,
        );
        let mock = MockTranscriber::new().with_output(first).with_output(second);

        let a = mock.transcribe(Path::new("a.wav"), None).await.unwrap();
        let b = mock.transcribe(Path::new("b.wav"), None).await.unwrap();
        assert_eq!(a.text, "one");
        assert_eq!(b.text, "two");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_fails_then_recovers() {
        let mock = MockTranscriber::new().failing_times(2);
        assert!(mock.transcribe(Path::new("a.wav"), None).await.is_err());
        assert!(mock.transcribe(Path::new("a.wav"), None).await.is_err());
        assert!(mock.transcribe(Path::new("a.wav"), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_exhausted_script_is_empty_output() {
        let mock = MockTranscriber::new();
        let out = mock.transcribe(Path::new("a.wav"), None).await.unwrap();
        assert!(out.is_blank());
    }
}
