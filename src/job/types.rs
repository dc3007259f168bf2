//! Job model: what to transcribe, how, and where the work currently stands.

use crate::error::{Result, ScribeqError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

pub type JobId = Uuid;

/// Where the input audio comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// A reference (URL or media ID) resolved by a `MediaFetcher`.
    RemoteMedia,
    /// A file already on local disk.
    LocalFile,
}

/// Output format for the persisted transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    #[default]
    Srt,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Srt => "srt",
            OutputFormat::Json => "json",
        }
    }
}

/// Per-job processing options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobOptions {
    /// Keep the downloaded/source audio after the job completes.
    #[serde(default)]
    pub keep_audio: bool,
    /// Target language for post-transcription translation, if any.
    #[serde(default)]
    pub translate_to: Option<String>,
    /// Source-language hint passed to the transcriber.
    #[serde(default)]
    pub source_language: Option<String>,
}

/// Lifecycle of a job. Transitions move forward through the processing
/// stages; `Failed` and `Cancelled` are reachable from any non-terminal
/// state, and a retry resets back to `Downloading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Downloading,
    Splitting,
    Transcribing,
    Translating,
    Saving,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    /// Position in the forward progression; terminal states have none.
    fn stage_order(&self) -> Option<u8> {
        match self {
            JobState::Pending => Some(0),
            JobState::Downloading => Some(1),
            JobState::Splitting => Some(2),
            JobState::Transcribing => Some(3),
            JobState::Translating => Some(4),
            JobState::Saving => Some(5),
            JobState::Completed => Some(6),
            JobState::Failed | JobState::Cancelled => None,
        }
    }

    /// Whether moving to `next` is a legal transition. Forward moves may
    /// skip stages (translation is optional), and `Downloading` is also
    /// reachable backwards as the retry reset point.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobState::Failed | JobState::Cancelled => true,
            JobState::Downloading => true,
            _ => match (self.stage_order(), next.stage_order()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Downloading => "downloading",
            JobState::Splitting => "splitting",
            JobState::Transcribing => "transcribing",
            JobState::Translating => "translating",
            JobState::Saving => "saving",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One unit of transcription work, tracked from submission to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    /// URL / media reference for remote jobs, file path for local ones.
    pub input: String,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub options: JobOptions,
    pub state: JobState,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Non-fatal issues accumulated during processing.
    pub warnings: Vec<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub enqueued_at: Option<DateTime<Utc>>,
    pub dequeued_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        kind: JobKind,
        input: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        format: OutputFormat,
        options: JobOptions,
        max_retries: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            input: input.into(),
            output_dir: output_dir.into(),
            format,
            options,
            state: JobState::Pending,
            retry_count: 0,
            max_retries,
            warnings: Vec::new(),
            last_error: None,
            created_at: Utc::now(),
            enqueued_at: None,
            dequeued_at: None,
            completed_at: None,
        }
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ScribeqError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn mark_enqueued(&mut self) {
        self.enqueued_at = Some(Utc::now());
    }

    pub fn mark_dequeued(&mut self) {
        self.dequeued_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.state = JobState::Completed;
        self.completed_at = Some(Utc::now());
        self.last_error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = JobState::Failed;
        self.completed_at = Some(Utc::now());
        self.last_error = Some(message.into());
    }

    /// Mark cancelled. Returns false (and leaves the job untouched) when
    /// the job already reached a terminal state.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Cancelled;
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Record a failed attempt and rewind to the download stage for the
    /// next one.
    pub fn reset_for_retry(&mut self, error: impl Into<String>) {
        self.retry_count += 1;
        self.last_error = Some(error.into());
        self.state = JobState::Downloading;
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
