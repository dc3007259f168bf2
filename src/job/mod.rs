//! Job scheduling: the model, the store, the bounded queue, the worker
//! pool and the submission surface.

pub mod queue;
pub mod service;
pub mod store;
pub mod types;
pub mod worker;

pub use queue::JobQueue;
pub use service::{JobRequest, JobService};
pub use store::{JobStore, MemoryJobStore};
pub use types::{Job, JobId, JobKind, JobOptions, JobState, OutputFormat};
pub use worker::{JobExecutor, WorkerPool, WorkerStats};
