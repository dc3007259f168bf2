//! Bounded in-memory job queue.
//!
//! Holds job IDs only; job records live in the store. Rejecting `enqueue`
//! at capacity is the backpressure signal, surfaced to submitters as
//! `QueueFull`. Cancellation removes a still-queued ID immediately, so a
//! cancelled job never occupies a capacity slot; there is no mid-flight
//! cancellation here.

use crate::job::types::JobId;
use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

pub struct JobQueue {
    inner: Mutex<VecDeque<JobId>>,
    notify: Notify,
    capacity: usize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueue a job ID. Returns false when the queue is at capacity.
    pub async fn enqueue(&self, id: JobId) -> bool {
        let mut queue = self.inner.lock().await;
        if queue.len() >= self.capacity {
            debug!("queue full ({}), rejecting job {id}", self.capacity);
            return false;
        }
        queue.push_back(id);
        drop(queue);
        self.notify.notify_one();
        true
    }

    /// Wait for the next job ID.
    pub async fn dequeue(&self) -> JobId {
        loop {
            if let Some(id) = self.try_dequeue().await {
                return id;
            }
            self.notify.notified().await;
        }
    }

    /// Like `dequeue`, but gives up after `timeout`. Workers poll with
    /// this so shutdown requests are observed between jobs.
    pub async fn dequeue_timeout(&self, timeout: Duration) -> Option<JobId> {
        tokio::time::timeout(timeout, self.dequeue()).await.ok()
    }

    async fn try_dequeue(&self) -> Option<JobId> {
        self.inner.lock().await.pop_front()
    }

    /// Remove a queued job. Returns true only when the ID was still
    /// waiting in the queue; a job already handed to a worker is not
    /// affected. The freed slot is available to `enqueue` at once.
    pub async fn cancel(&self, id: JobId) -> bool {
        let mut queue = self.inner.lock().await;
        if let Some(pos) = queue.iter().position(|queued| *queued == id) {
            queue.remove(pos);
            debug!("removed cancelled job {id} from queue");
            true
        } else {
            false
        }
    }

    /// Number of jobs waiting.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.size().await == 0
    }

    /// Whether `enqueue` would be rejected right now.
    pub async fn is_full(&self) -> bool {
        self.inner.lock().await.len() >= self.capacity
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}
