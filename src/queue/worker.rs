//! Worker pool draining the job queue

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{JobQueue, QueueError};
use crate::error::panic_message;
use crate::models::ClaimedJob;
use crate::scoring::ScoringEngine;

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub count: usize,
    /// Sleep between claims when the queue is empty
    pub poll_interval: Duration,
    /// Terminal jobs older than this are purged
    pub retention: Duration,
    pub janitor_interval: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            count: 2,
            poll_interval: Duration::from_millis(200),
            retention: Duration::from_secs(24 * 3600),
            janitor_interval: Duration::from_secs(300),
        }
    }
}

/// Handle to the spawned workers and janitor
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        queue: Arc<dyn JobQueue>,
        engine: Arc<ScoringEngine>,
        settings: WorkerSettings,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let mut handles = Vec::with_capacity(settings.count + 1);

        for worker_id in 0..settings.count {
            handles.push(tokio::spawn(run_worker(
                worker_id,
                queue.clone(),
                engine.clone(),
                settings.poll_interval,
                rx.clone(),
            )));
        }
        handles.push(tokio::spawn(run_janitor(queue, settings, rx)));

        tracing::info!("Started {} scoring worker(s)", settings.count);
        Self { shutdown, handles }
    }

    /// Signal every task to stop and wait for in-flight jobs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }
        tracing::info!("Scoring workers stopped");
    }
}

/// Claim and process one job. Returns `false` if the queue had nothing to hand out.
pub async fn process_next(queue: &dyn JobQueue, engine: &ScoringEngine) -> Result<bool, QueueError> {
    match queue.claim().await? {
        Some(job) => {
            process_job(queue, engine, job).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

async fn process_job(queue: &dyn JobQueue, engine: &ScoringEngine, job: ClaimedJob) -> Result<(), QueueError> {
    tracing::debug!("Scoring job {} (attempt {})", job.id, job.attempts);

    match catch_unwind(AssertUnwindSafe(|| engine.predict(&job.features))) {
        Ok(Ok(result)) => {
            queue.complete(job.id, result).await?;
            tracing::info!(
                "Job {} succeeded: {} ({:.4})",
                job.id, result.risk_category, result.default_probability
            );
        }
        Ok(Err(e)) => {
            tracing::warn!("Job {} failed: {}", job.id, e);
            queue.fail(job.id, e.to_string()).await?;
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::error!("Job {} panicked while scoring: {}", job.id, reason);
            queue.fail(job.id, format!("scoring panicked: {}", reason)).await?;
        }
    }
    Ok(())
}

async fn run_worker(
    worker_id: usize,
    queue: Arc<dyn JobQueue>,
    engine: Arc<ScoringEngine>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!("Worker {} started", worker_id);

    while !*shutdown.borrow() {
        match process_next(queue.as_ref(), &engine).await {
            Ok(true) => continue,
            Ok(false) => {}
            // The job stays leased and is redelivered once the lease runs out
            Err(e) => tracing::warn!("Worker {} queue error: {}", worker_id, e),
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            changed = shutdown.changed() => {
                // Pool handle dropped without an explicit shutdown
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Worker {} stopped", worker_id);
}

async fn run_janitor(queue: Arc<dyn JobQueue>, settings: WorkerSettings, mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        tokio::select! {
            _ = tokio::time::sleep(settings.janitor_interval) => {}
            _ = shutdown.changed() => break,
        }

        match queue.purge_finished(settings.retention).await {
            Ok(0) => {}
            Ok(n) => tracing::info!("Purged {} finished job(s)", n),
            Err(e) => tracing::warn!("Job purge failed: {}", e),
        }
    }
}
