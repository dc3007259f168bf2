//! Submission surface: the contract embedders call.
//!
//! Composes the store and the queue. Every read reflects the last
//! persisted state; callers never observe a job mid-mutation.

use crate::config::Config;
use crate::error::{Result, ScribeqError};
use crate::job::queue::JobQueue;
use crate::job::store::JobStore;
use crate::job::types::{Job, JobId, JobKind, JobOptions, JobState, OutputFormat};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// What to transcribe, as supplied by the caller.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub kind: JobKind,
    pub input: String,
    /// Defaults to the configured output base directory.
    pub output_dir: Option<PathBuf>,
    pub format: OutputFormat,
    pub options: JobOptions,
}

impl JobRequest {
    pub fn local_file(path: impl Into<String>) -> Self {
        Self {
            kind: JobKind::LocalFile,
            input: path.into(),
            output_dir: None,
            format: OutputFormat::default(),
            options: JobOptions::default(),
        }
    }

    pub fn remote_media(reference: impl Into<String>) -> Self {
        Self {
            kind: JobKind::RemoteMedia,
            input: reference.into(),
            output_dir: None,
            format: OutputFormat::default(),
            options: JobOptions::default(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

pub struct JobService {
    queue: Arc<JobQueue>,
    store: Arc<dyn JobStore>,
    config: Config,
}

impl JobService {
    pub fn new(queue: Arc<JobQueue>, store: Arc<dyn JobStore>, config: Config) -> Self {
        Self {
            queue,
            store,
            config,
        }
    }

    /// Persist a new job and enqueue it. `QueueFull` when the queue
    /// rejects the ID; the job record then carries the rejection too.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId> {
        let output_dir = request
            .output_dir
            .unwrap_or_else(|| self.config.output.base_dir.clone());
        let mut job = Job::new(
            request.kind,
            request.input,
            output_dir,
            request.format,
            request.options,
            self.config.worker.max_retries,
        );
        // The record must be persisted before the ID becomes visible to
        // workers, so the timestamp is set optimistically and undone when
        // the queue rejects the job.
        job.mark_enqueued();
        self.store.save(&job).await?;

        if !self.queue.enqueue(job.id).await {
            let capacity = self.config.queue.capacity;
            job.enqueued_at = None;
            job.fail(format!("queue full (capacity {capacity})"));
            self.store.save(&job).await?;
            return Err(ScribeqError::QueueFull { capacity });
        }

        info!("job {} submitted ({})", job.id, job.input);
        Ok(job.id)
    }

    /// Last persisted state of a job.
    pub async fn status(&self, id: JobId) -> Result<Job> {
        self.store.load(id).await
    }

    pub async fn list(&self, state: Option<JobState>) -> Result<Vec<Job>> {
        self.store.list(state).await
    }

    /// Cancel a job. Returns true when the cancellation took effect,
    /// false when the job had already reached a terminal state. A job
    /// already picked up by a worker finishes its current attempt; the
    /// worker re-checks the stored state between stages.
    pub async fn cancel(&self, id: JobId) -> Result<bool> {
        let mut job = self.store.load(id).await?;
        let dequeued_already = !self.queue.cancel(id).await;
        if !job.cancel() {
            return Ok(false);
        }
        self.store.save(&job).await?;
        info!(
            "job {id} cancelled{}",
            if dequeued_already { " (in flight)" } else { "" }
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::store::MemoryJobStore;
    use uuid::Uuid;

    fn service(queue_capacity: usize) -> (JobService, Arc<JobQueue>, Arc<MemoryJobStore>) {
        let mut config = Config::default();
        config.queue.capacity = queue_capacity;
        let queue = Arc::new(JobQueue::new(queue_capacity));
        let store = Arc::new(MemoryJobStore::new());
        let service = JobService::new(
            Arc::clone(&queue),
            Arc::clone(&store) as Arc<dyn JobStore>,
            config,
        );
        (service, queue, store)
    }

    #[tokio::test]
    async fn test_submit_persists_and_enqueues() {
        let (service, queue, _store) = service(8);
        let id = service
            .submit(JobRequest::local_file("/tmp/a.wav"))
            .await
            .unwrap();

        let job = service.status(id).await.unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert!(job.enqueued_at.is_some());
        assert_eq!(queue.size().await, 1);
    }

    #[tokio::test]
    async fn test_submit_queue_full() {
        let (service, _queue, _store) = service(1);
        service
            .submit(JobRequest::local_file("/tmp/a.wav"))
            .await
            .unwrap();

        let err = service
            .submit(JobRequest::local_file("/tmp/b.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeqError::QueueFull { capacity: 1 }));

        // The rejected job is visible in the store as failed, with no
        // enqueue timestamp for a queue it never entered.
        let failed = service.list(Some(JobState::Failed)).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].last_error.as_deref().unwrap_or("").contains("queue full"));
        assert!(failed[0].enqueued_at.is_none());
    }

    #[tokio::test]
    async fn test_status_unknown_job() {
        let (service, _queue, _store) = service(8);
        let err = service.status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ScribeqError::JobNotFound { .. }));
    }

    #[tokio::test]
    async fn test_cancel_queued_job() {
        let (service, queue, _store) = service(8);
        let id = service
            .submit(JobRequest::local_file("/tmp/a.wav"))
            .await
            .unwrap();

        assert!(service.cancel(id).await.unwrap());
        let job = service.status(id).await.unwrap();
        assert_eq!(job.state, JobState::Cancelled);
        assert_eq!(queue.size().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_after_terminal() {
        let (service, _queue, store) = service(8);
        let id = service
            .submit(JobRequest::local_file("/tmp/a.wav"))
            .await
            .unwrap();

        let mut job = store.load(id).await.unwrap();
        job.complete();
        store.save(&job).await.unwrap();

        assert!(!service.cancel(id).await.unwrap());
        assert_eq!(service.status(id).await.unwrap().state, JobState::Completed);
    }

    #[tokio::test]
    async fn test_request_builders() {
        let request = JobRequest::remote_media("https://example.com/talk")
            .with_format(OutputFormat::Json)
            .with_output_dir("/tmp/custom")
            .with_options(JobOptions {
                translate_to: Some("en".to_string()),
                ..JobOptions::default()
            });
        assert_eq!(request.kind, JobKind::RemoteMedia);
        assert_eq!(request.format, OutputFormat::Json);
        assert_eq!(request.output_dir.as_deref().unwrap().to_str(), Some("/tmp/custom"));
        assert_eq!(request.options.translate_to.as_deref(), Some("en"));
    }
}
