//! Worker pool: pulls job IDs off the queue and runs them through the
//! pipeline, bounded by a semaphore.
//!
//! Retry policy: transient failures (backend unavailable, timeouts,
//! download errors) are retried with exponential backoff, restarting the
//! job from the download stage. Everything else fails the job on the
//! first attempt.

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::job::queue::JobQueue;
use crate::job::store::JobStore;
use crate::job::types::{Job, JobId, JobState};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How a job attempt ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    /// The job was cancelled between stages; its state is already
    /// `Cancelled` and must be persisted, not overwritten.
    Cancelled,
}

/// Runs a single job attempt end to end. Implemented by the pipeline
/// orchestrator; tests substitute mocks.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &mut Job) -> Result<ExecutionOutcome>;
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time view of pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub skipped: u64,
    pub in_flight: usize,
}

pub struct WorkerPool {
    queue: Arc<JobQueue>,
    store: Arc<dyn JobStore>,
    executor: Arc<dyn JobExecutor>,
    config: WorkerConfig,
    running: AtomicBool,
    permits: Arc<Semaphore>,
    counters: Counters,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<JobQueue>,
        store: Arc<dyn JobStore>,
        executor: Arc<dyn JobExecutor>,
        config: WorkerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            queue,
            store,
            executor,
            config,
            running: AtomicBool::new(false),
            permits,
            counters: Counters::default(),
        }
    }

    /// Dequeue-and-dispatch loop. Returns once `stop` has been called and
    /// every in-flight job has drained.
    pub async fn run(self: Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        let poll = Duration::from_millis(self.config.dequeue_poll_ms);
        let mut tasks: JoinSet<()> = JoinSet::new();
        info!(
            "worker pool started ({} concurrent job(s))",
            self.config.max_concurrent_jobs
        );

        while self.running.load(Ordering::SeqCst) {
            // Reap finished tasks so the set does not grow unbounded.
            while tasks.try_join_next().is_some() {}

            let Some(id) = self.queue.dequeue_timeout(poll).await else {
                continue;
            };
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let pool = Arc::clone(&self);
            tasks.spawn(async move {
                pool.process_job(id).await;
                drop(permit);
            });
        }

        debug!("worker pool draining {} in-flight job(s)", tasks.len());
        while tasks.join_next().await.is_some() {}
        info!("worker pool stopped");
    }

    /// Request shutdown. `run` finishes its in-flight jobs and returns;
    /// queued jobs stay queued.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            retried: self.counters.retried.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            in_flight: self.config.max_concurrent_jobs - self.permits.available_permits(),
        }
    }

    async fn process_job(&self, id: JobId) {
        let mut job = match self.store.load(id).await {
            Ok(job) => job,
            Err(e) => {
                error!("dequeued job {id} could not be loaded: {e}");
                return;
            }
        };

        // Cancelled after enqueue but before the queue noticed.
        if job.state == JobState::Cancelled {
            debug!("skipping cancelled job {id}");
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        job.mark_dequeued();
        info!("job {id}: started (attempt {})", job.retry_count + 1);

        loop {
            match self.executor.execute(&mut job).await {
                Ok(ExecutionOutcome::Completed) => {
                    job.complete();
                    self.persist(&job).await;
                    self.counters.completed.fetch_add(1, Ordering::Relaxed);
                    info!("job {id}: completed");
                    return;
                }
                Ok(ExecutionOutcome::Cancelled) => {
                    self.persist(&job).await;
                    self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                    info!("job {id}: cancelled mid-flight");
                    return;
                }
                Err(e) if e.is_transient() && job.can_retry() => {
                    job.reset_for_retry(e.to_string());
                    self.persist(&job).await;
                    self.counters.retried.fetch_add(1, Ordering::Relaxed);
                    let backoff = Duration::from_secs(1u64 << job.retry_count.min(16));
                    warn!(
                        "job {id}: transient failure ({e}), retry {}/{} in {:.0?}",
                        job.retry_count, job.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    job.fail(e.to_string());
                    self.persist(&job).await;
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!("job {id}: failed after {} retries: {e}", job.retry_count);
                    return;
                }
            }
        }
    }

    async fn persist(&self, job: &Job) {
        if let Err(e) = self.store.save(job).await {
            error!("failed to persist job {}: {e}", job.id);
        }
    }
}
