//! Job Queue - async scoring jobs
//!
//! ```text
//!   enqueue ──► queued ──claim──► processing ──complete──► succeeded
//!                 ▲                    │      └───fail─────► failed
//!                 └── lease expired ───┘
//! ```
//!
//! Delivery is at-least-once. A worker that dies mid-job leaves the job in
//! `processing` until its lease runs out, after which it is claimed again.
//! Re-execution is safe because scoring has no side effects. Completing a job
//! that is already terminal is a no-op, so duplicate deliveries converge.

pub mod memory;
pub mod postgres;
pub mod worker;

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{ClaimedJob, FeatureVector, JobId, JobStatus, PredictionResult};

pub use self::memory::MemoryJobQueue;
pub use self::postgres::PgJobQueue;
pub use self::worker::{WorkerPool, WorkerSettings};

/// Error stored on a job that kept getting redelivered
pub const ATTEMPTS_EXHAUSTED: &str = "job abandoned after exhausting delivery attempts";

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue backend unavailable: {0}")]
    Unavailable(String),

    #[error("queue operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("corrupt job record {id}: {reason}")]
    Corrupt { id: JobId, reason: String },
}

impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        QueueError::Unavailable(err.to_string())
    }
}

/// Delivery tuning shared by all backends
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    /// How long a claimed job stays hidden from other workers
    pub lease: Duration,
    /// Deliveries before a job is failed instead of redelivered
    pub max_attempts: i32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Persist a new job in `queued` and return its id
    async fn enqueue(&self, features: FeatureVector) -> Result<JobId, QueueError>;

    /// Current status, or `None` if the id is unknown
    async fn poll(&self, id: JobId) -> Result<Option<JobStatus>, QueueError>;

    /// Move one deliverable job to `processing` under a fresh lease
    async fn claim(&self) -> Result<Option<ClaimedJob>, QueueError>;

    async fn complete(&self, id: JobId, result: PredictionResult) -> Result<(), QueueError>;

    async fn fail(&self, id: JobId, error: String) -> Result<(), QueueError>;

    /// Delete terminal jobs last updated more than `older_than` ago
    async fn purge_finished(&self, older_than: Duration) -> Result<u64, QueueError>;

    fn name(&self) -> &'static str;
}
