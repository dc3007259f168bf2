//! Drives one job through its processing stages.
//!
//! Stage order: download (remote jobs), split, transcribe, optional
//! translation, save. The job record is persisted at every stage
//! boundary, and the stored state is re-checked there so a cancellation
//! issued mid-flight stops the job at the next boundary.

use crate::config::Config;
use crate::error::{Result, ScribeqError};
use crate::job::store::JobStore;
use crate::job::types::{Job, JobKind, JobState};
use crate::job::worker::{ExecutionOutcome, JobExecutor};
use crate::media::codec::AudioCodec;
use crate::media::segmenter::{AudioChunk, Segmenter, cleanup_chunks};
use crate::pipeline::chunk_processor::ChunkProcessor;
use crate::services::{MediaFetcher, Reviser, Transcriber, TranscriptSink};
use crate::transcript::{ChunkTranscription, TranscriptionOutput, combine, format_timestamp, reconcile};
use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct PipelineOrchestrator {
    store: Arc<dyn JobStore>,
    fetcher: Arc<dyn MediaFetcher>,
    segmenter: Arc<Segmenter>,
    processor: ChunkProcessor,
    reviser: Option<Arc<dyn Reviser>>,
    sink: Arc<dyn TranscriptSink>,
    config: Config,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        fetcher: Arc<dyn MediaFetcher>,
        transcriber: Arc<dyn Transcriber>,
        sink: Arc<dyn TranscriptSink>,
        codec: Arc<dyn AudioCodec>,
        config: Config,
    ) -> Self {
        let segmenter = Arc::new(Segmenter::new(codec, config.segmenter.clone()));
        Self {
            store,
            fetcher,
            segmenter,
            processor: ChunkProcessor::new(transcriber),
            reviser: None,
            sink,
            config,
        }
    }

    pub fn with_reviser(mut self, reviser: Arc<dyn Reviser>) -> Self {
        self.reviser = Some(reviser);
        self
    }

    /// Move the job to `next` and persist it. Returns false when the
    /// stored record says the job was cancelled in the meantime.
    async fn advance(&self, job: &mut Job, next: JobState) -> Result<bool> {
        if let Ok(stored) = self.store.load(job.id).await
            && stored.state == JobState::Cancelled
        {
            info!("job {}: cancellation observed before {next}", job.id);
            job.cancel();
            return Ok(false);
        }
        job.transition(next)?;
        self.store.save(job).await?;
        Ok(true)
    }

    /// Resolve the job input to a local audio file. The boolean says
    /// whether we downloaded it (and may delete it afterwards).
    async fn acquire_audio(&self, job: &Job) -> Result<(PathBuf, bool)> {
        match job.kind {
            JobKind::LocalFile => {
                let path = PathBuf::from(&job.input);
                if !path.is_file() {
                    return Err(ScribeqError::UnreadableAudio {
                        path: job.input.clone(),
                        message: "no such file".to_string(),
                    });
                }
                Ok((path, false))
            }
            JobKind::RemoteMedia => {
                let dest = job.output_dir.join("downloads");
                let path = self.fetcher.fetch(&job.input, &dest).await?;
                debug!("job {}: fetched {} to {}", job.id, job.input, path.display());
                Ok((path, true))
            }
        }
    }

    async fn split(&self, audio_path: &Path) -> Result<Vec<AudioChunk>> {
        let segmenter = Arc::clone(&self.segmenter);
        let path = audio_path.to_path_buf();
        let max_bytes = self.config.segmenter.max_chunk_bytes;
        tokio::task::spawn_blocking(move || segmenter.split(&path, max_bytes))
            .await
            .map_err(|e| ScribeqError::Other(format!("split task panicked: {e}")))?
    }

    /// Fan the chunks out to the backend, bounded by the per-job chunk
    /// concurrency. A failed chunk becomes an empty result plus a warning
    /// on the job; only an entirely empty transcript fails the job.
    async fn transcribe_chunks(
        &self,
        job: &mut Job,
        chunks: &[AudioChunk],
    ) -> Result<TranscriptionOutput> {
        let language = job.options.source_language.clone();

        if let [only] = chunks {
            // Single chunk: timestamps are already global, no fan-out or
            // reconciliation needed.
            let result = self.processor.process(only, language.as_deref()).await?;
            return Ok(result.output);
        }

        let permits = Arc::new(Semaphore::new(self.config.worker.chunk_concurrency.max(1)));
        let attempts = chunks.iter().map(|chunk| {
            let permits = Arc::clone(&permits);
            let language = language.clone();
            async move {
                let _permit = permits.acquire().await;
                self.processor.process(chunk, language.as_deref()).await
            }
        });

        let mut results: Vec<ChunkTranscription> = Vec::with_capacity(chunks.len());
        for (chunk, attempt) in chunks.iter().zip(join_all(attempts).await) {
            match attempt {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("job {}: chunk {} failed: {e}", job.id, chunk.index);
                    job.add_warning(format!("chunk {} produced no text: {e}", chunk.index));
                    results.push(ChunkTranscription {
                        chunk_index: chunk.index,
                        start_offset: chunk.start_offset,
                        output: TranscriptionOutput::empty(chunk.duration),
                    });
                }
            }
        }

        let segments = reconcile(&results);
        Ok(combine(&results, segments))
    }

    /// Rewrite each non-empty segment into the target language, keeping
    /// the original text (with a warning) when revision fails.
    async fn translate(
        &self,
        job: &mut Job,
        output: TranscriptionOutput,
        target: &str,
    ) -> TranscriptionOutput {
        let Some(reviser) = &self.reviser else {
            warn!("job {}: translation requested but no reviser configured", job.id);
            job.add_warning("translation requested but no reviser configured".to_string());
            return output;
        };

        let duration = output.duration;
        let language = output.language.clone();
        let mut segments = output.segments;
        for segment in &mut segments {
            if segment.is_blank() {
                continue;
            }
            match reviser.revise(&segment.text, target).await {
                Ok(text) => segment.text = text,
                Err(e) => {
                    warn!("job {}: revision failed at {}: {e}", job.id, format_timestamp(segment.start));
                    job.add_warning(format!(
                        "segment at {} kept untranslated: {e}",
                        format_timestamp(segment.start)
                    ));
                }
            }
        }
        TranscriptionOutput::from_segments(segments, language, duration)
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        chunks: &[AudioChunk],
    ) -> Result<ExecutionOutcome> {
        if !self.advance(job, JobState::Transcribing).await? {
            return Ok(ExecutionOutcome::Cancelled);
        }
        let mut output = self.transcribe_chunks(job, chunks).await?;
        if output.is_blank() {
            return Err(ScribeqError::InsufficientResult {
                chunks: chunks.len(),
            });
        }

        if let Some(target) = job.options.translate_to.clone() {
            if !self.advance(job, JobState::Translating).await? {
                return Ok(ExecutionOutcome::Cancelled);
            }
            output = self.translate(job, output, &target).await;
        }

        if !self.advance(job, JobState::Saving).await? {
            return Ok(ExecutionOutcome::Cancelled);
        }
        let artifacts = self.sink.persist(job, &output).await?;
        debug!("job {}: persisted {} artifact(s)", job.id, artifacts.len());
        Ok(ExecutionOutcome::Completed)
    }
}

#[async_trait]
impl JobExecutor for PipelineOrchestrator {
    async fn execute(&self, job: &mut Job) -> Result<ExecutionOutcome> {
        if !self.advance(job, JobState::Downloading).await? {
            return Ok(ExecutionOutcome::Cancelled);
        }
        let (audio_path, downloaded) = self.acquire_audio(job).await?;

        if !self.advance(job, JobState::Splitting).await? {
            return Ok(ExecutionOutcome::Cancelled);
        }
        let chunks = self.split(&audio_path).await?;
        info!("job {}: {} chunk(s)", job.id, chunks.len());

        let outcome = self.run_stages(job, &chunks).await;

        cleanup_chunks(&chunks);
        let keep_audio = job.options.keep_audio || self.config.output.keep_audio;
        if downloaded && !keep_audio {
            if let Err(e) = std::fs::remove_file(&audio_path) {
                warn!("job {}: failed to remove downloaded audio: {e}", job.id);
            }
        }

        outcome
    }
}
