//! Job persistence seam.
//!
//! Workers and the submission surface never hand out live job objects;
//! every externally visible read goes through a store lookup, so callers
//! always see the last persisted state.

use crate::error::{Result, ScribeqError};
use crate::job::types::{Job, JobId, JobState};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence for jobs. `save` upserts the full record.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save(&self, job: &Job) -> Result<()>;

    async fn load(&self, id: JobId) -> Result<Job>;

    /// All jobs, optionally filtered by state, newest first.
    async fn list(&self, state: Option<JobState>) -> Result<Vec<Job>>;
}

/// In-memory store, the reference implementation for tests and embedding.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, job: &Job) -> Result<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn load(&self, id: JobId) -> Result<Job> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ScribeqError::JobNotFound { id: id.to_string() })
    }

    async fn list(&self, state: Option<JobState>) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut out: Vec<Job> = jobs
            .values()
            .filter(|j| state.is_none_or(|s| j.state == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
