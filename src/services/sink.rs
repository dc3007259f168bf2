//! Transcript persistence.
//!
//! `FileSink` writes the transcript in the job's chosen format next to a
//! plain-text timestamp listing and a JSON metadata file, mirroring what
//! downstream tooling expects to pick up per job.

use crate::error::{Result, ScribeqError};
use crate::job::types::{Job, JobId, OutputFormat};
use crate::transcript::{TranscriptionOutput, format_timestamp};
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Persist the final output for `job`, returning the artifacts written.
    async fn persist(&self, job: &Job, output: &TranscriptionOutput) -> Result<Vec<PathBuf>>;
}

/// Writes transcript artifacts into the job's output directory.
pub struct FileSink;

impl FileSink {
    fn stem_for(job: &Job) -> String {
        let stem = Path::new(&job.input)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cleaned: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.is_empty() {
            job.id.to_string()
        } else {
            cleaned
        }
    }

    fn render_transcript(format: OutputFormat, output: &TranscriptionOutput) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(output.text.clone()),
            OutputFormat::Srt => Ok(render_srt(output)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(output)
                .map_err(|e| ScribeqError::Other(e.to_string()))?),
        }
    }
}

#[async_trait]
impl TranscriptSink for FileSink {
    async fn persist(&self, job: &Job, output: &TranscriptionOutput) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&job.output_dir)?;
        let stem = Self::stem_for(job);
        let mut written = Vec::with_capacity(3);

        let transcript_path = job
            .output_dir
            .join(format!("{stem}.{}", job.format.extension()));
        std::fs::write(
            &transcript_path,
            Self::render_transcript(job.format, output)?,
        )?;
        written.push(transcript_path);

        let listing_path = job.output_dir.join(format!("{stem}.timestamps.txt"));
        std::fs::write(&listing_path, render_timestamp_listing(output))?;
        written.push(listing_path);

        let metadata_path = job.output_dir.join(format!("{stem}.meta.json"));
        let metadata = json!({
            "job_id": job.id,
            "input": job.input,
            "format": job.format,
            "language": output.language,
            "duration_secs": output.duration,
            "segment_count": output.segments.len(),
            "warnings": job.warnings,
            "generated_at": Utc::now(),
        });
        std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)
            .map_err(|e| ScribeqError::Other(e.to_string()))?)?;
        written.push(metadata_path);

        info!(
            "job {}: wrote {} artifact(s) to {}",
            job.id,
            written.len(),
            job.output_dir.display()
        );
        Ok(written)
    }
}

/// One line per segment: `[HH:MM:SS.mmm --> HH:MM:SS.mmm] text`.
fn render_timestamp_listing(output: &TranscriptionOutput) -> String {
    let mut listing = String::new();
    for segment in &output.segments {
        let _ = writeln!(
            listing,
            "[{} --> {}] {}",
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            segment.text.trim()
        );
    }
    listing
}

fn render_srt(output: &TranscriptionOutput) -> String {
    let mut srt = String::new();
    let mut counter = 0usize;
    for segment in &output.segments {
        if segment.is_blank() {
            continue;
        }
        counter += 1;
        let _ = writeln!(
            srt,
            "{counter}\n{} --> {}\n{}\n",
            srt_timestamp(segment.start),
            srt_timestamp(segment.end),
            segment.text.trim()
        );
    }
    srt
}

/// SRT uses a comma before the millisecond field.
fn srt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds).replacen('.', ",", 1)
}

/// Test sink that records outputs in memory.
#[derive(Default)]
pub struct MemorySink {
    persisted: Mutex<Vec<(JobId, TranscriptionOutput)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<(JobId, TranscriptionOutput)> {
        self.persisted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.persisted.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl TranscriptSink for MemorySink {
    async fn persist(&self, job: &Job, output: &TranscriptionOutput) -> Result<Vec<PathBuf>> {
        self.persisted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((job.id, output.clone()));
        Ok(Vec::new())
    }
}
