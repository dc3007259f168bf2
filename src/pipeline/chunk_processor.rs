//! Processes one audio chunk through the transcription backend.

use crate::error::Result;
use crate::media::AudioChunk;
use crate::services::Transcriber;
use crate::transcript::ChunkTranscription;
use log::debug;
use std::sync::Arc;

/// Transcribes a single chunk and tags the result with the chunk's
/// position so the reconciler can project timestamps later.
///
/// Deliberately retry-free: attempt policy lives in the worker, and a
/// chunk failure inside a fan-out is handled by the orchestrator.
pub struct ChunkProcessor {
    transcriber: Arc<dyn Transcriber>,
}

impl ChunkProcessor {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    /// An empty or whitespace-only transcription is a valid result, not
    /// an error; silent audio happens.
    pub async fn process(
        &self,
        chunk: &AudioChunk,
        source_language: Option<&str>,
    ) -> Result<ChunkTranscription> {
        let output = self
            .transcriber
            .transcribe(&chunk.path, source_language)
            .await?;
        debug!(
            "chunk {}/{} at {:.1}s: {} segment(s)",
            chunk.index,
            chunk.total,
            chunk.start_offset,
            output.segments.len()
        );
        Ok(ChunkTranscription {
            chunk_index: chunk.index,
            start_offset: chunk.start_offset,
            output,
        })
    }
}
