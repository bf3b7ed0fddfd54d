//! In-process job queue

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{JobQueue, QueueError, QueueSettings, ATTEMPTS_EXHAUSTED};
use crate::models::{ClaimedJob, FeatureVector, JobId, JobState, JobStatus, PredictionResult};

/// Lease deadline used when `now + lease` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug)]
struct JobRecord {
    features: FeatureVector,
    state: JobState,
    result: Option<PredictionResult>,
    error: Option<String>,
    attempts: i32,
    lease_expires_at: Option<Instant>,
    updated_at: DateTime<Utc>,
    touched: Instant,
}

impl JobRecord {
    fn status(&self, id: JobId) -> JobStatus {
        JobStatus {
            task_id: id,
            state: self.state,
            result: self.result,
            error: self.error.clone(),
            attempts: self.attempts,
            updated_at: self.updated_at,
        }
    }

    fn transition(&mut self, state: JobState) {
        self.state = state;
        self.updated_at = Utc::now();
        self.touched = Instant::now();
    }
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: HashMap<JobId, JobRecord>,
    pending: VecDeque<JobId>,
    in_flight: HashSet<JobId>,
}

impl QueueState {
    /// Requeue or fail every processing job whose lease ran out
    fn reclaim_expired(&mut self, now: Instant, max_attempts: i32) {
        let expired: Vec<JobId> = self
            .in_flight
            .iter()
            .filter(|id| {
                self.jobs
                    .get(*id)
                    .and_then(|job| job.lease_expires_at)
                    .map_or(true, |deadline| deadline <= now)
            })
            .copied()
            .collect();

        for id in expired {
            self.in_flight.remove(&id);
            let Some(job) = self.jobs.get_mut(&id) else { continue };
            if job.state != JobState::Processing {
                continue;
            }

            job.lease_expires_at = None;
            if job.attempts >= max_attempts {
                tracing::warn!("Job {} failed after {} deliveries", id, job.attempts);
                job.error = Some(ATTEMPTS_EXHAUSTED.to_string());
                job.transition(JobState::Failed);
            } else {
                tracing::debug!("Lease expired on job {}, redelivering", id);
                job.transition(JobState::Queued);
                self.pending.push_back(id);
            }
        }
    }

    fn finish(&mut self, id: JobId, state: JobState, result: Option<PredictionResult>, error: Option<String>) {
        let Some(job) = self.jobs.get_mut(&id) else {
            tracing::debug!("Finished job {} no longer tracked", id);
            return;
        };
        if job.state.is_terminal() {
            tracing::debug!("Job {} already {}, ignoring duplicate completion", id, job.state);
            return;
        }

        job.result = result;
        job.error = error;
        job.lease_expires_at = None;
        job.transition(state);
        self.in_flight.remove(&id);
    }
}

/// Job queue held in process memory
///
/// Not durable across restarts; use [`super::PgJobQueue`] when jobs must
/// survive the process.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    state: Mutex<QueueState>,
    settings: QueueSettings,
}

impl MemoryJobQueue {
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            settings,
        }
    }

    /// Number of tracked jobs in any state
    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, features: FeatureVector) -> Result<JobId, QueueError> {
        let id = Uuid::new_v4();
        let mut state = self.state.lock();
        state.jobs.insert(id, JobRecord {
            features,
            state: JobState::Queued,
            result: None,
            error: None,
            attempts: 0,
            lease_expires_at: None,
            updated_at: Utc::now(),
            touched: Instant::now(),
        });
        state.pending.push_back(id);
        Ok(id)
    }

    async fn poll(&self, id: JobId) -> Result<Option<JobStatus>, QueueError> {
        Ok(self.state.lock().jobs.get(&id).map(|job| job.status(id)))
    }

    async fn claim(&self) -> Result<Option<ClaimedJob>, QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.reclaim_expired(now, self.settings.max_attempts);

        while let Some(id) = state.pending.pop_front() {
            let Some(job) = state.jobs.get_mut(&id) else { continue };
            // Finished by a late worker while waiting for redelivery
            if job.state != JobState::Queued {
                continue;
            }

            job.attempts += 1;
            job.lease_expires_at = Some(
                now.checked_add(self.settings.lease)
                    .unwrap_or_else(|| now + FAR_FUTURE),
            );
            job.transition(JobState::Processing);
            let claimed = ClaimedJob {
                id,
                features: job.features.clone(),
                attempts: job.attempts,
            };
            state.in_flight.insert(id);
            return Ok(Some(claimed));
        }

        Ok(None)
    }

    async fn complete(&self, id: JobId, result: PredictionResult) -> Result<(), QueueError> {
        self.state.lock().finish(id, JobState::Succeeded, Some(result), None);
        Ok(())
    }

    async fn fail(&self, id: JobId, error: String) -> Result<(), QueueError> {
        self.state.lock().finish(id, JobState::Failed, None, Some(error));
        Ok(())
    }

    async fn purge_finished(&self, older_than: Duration) -> Result<u64, QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.jobs.len();
        state.jobs.retain(|_, job| {
            !(job.state.is_terminal() && now.saturating_duration_since(job.touched) >= older_than)
        });
        Ok((before - state.jobs.len()) as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskCategory;

    fn result() -> PredictionResult {
        PredictionResult { default_probability: 0.8, risk_category: RiskCategory::High }
    }

    fn short_lease(max_attempts: i32) -> QueueSettings {
        QueueSettings {
            lease: Duration::from_millis(50),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let queue = MemoryJobQueue::new(QueueSettings::default());
        let id = queue.enqueue(FeatureVector::zeroed()).await.unwrap();

        let status = queue.poll(id).await.unwrap().unwrap();
        assert_eq!(status.state, JobState::Queued);
        assert_eq!(status.attempts, 0);

        let claimed = queue.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(queue.poll(id).await.unwrap().unwrap().state, JobState::Processing);

        queue.complete(id, result()).await.unwrap();
        let status = queue.poll(id).await.unwrap().unwrap();
        assert_eq!(status.state, JobState::Succeeded);
        assert_eq!(status.result, Some(result()));
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn test_failed_job_keeps_error() {
        let queue = MemoryJobQueue::new(QueueSettings::default());
        let id = queue.enqueue(FeatureVector::zeroed()).await.unwrap();
        queue.claim().await.unwrap().unwrap();

        queue.fail(id, "model produced NaN".into()).await.unwrap();
        let status = queue.poll(id).await.unwrap().unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some("model produced NaN"));
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let queue = MemoryJobQueue::new(QueueSettings::default());
        assert!(queue.poll(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_queue_claims_nothing() {
        let queue = MemoryJobQueue::new(QueueSettings::default());
        assert!(queue.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_lease_is_redelivered() {
        let queue = MemoryJobQueue::new(short_lease(5));
        let id = queue.enqueue(FeatureVector::zeroed()).await.unwrap();

        let first = queue.claim().await.unwrap().unwrap();
        assert!(queue.claim().await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = queue.claim().await.unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.attempts, 2);

        // Both deliveries report back; the second completion is ignored
        queue.complete(id, result()).await.unwrap();
        queue.fail(id, "late duplicate".into()).await.unwrap();
        assert_eq!(queue.poll(id).await.unwrap().unwrap().state, JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_late_completion_wins_over_redelivery() {
        let queue = MemoryJobQueue::new(short_lease(5));
        let slow = queue.enqueue(FeatureVector::zeroed()).await.unwrap();
        queue.claim().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The sweep puts the slow job back behind the newer one
        let fresh = queue.enqueue(FeatureVector::zeroed()).await.unwrap();
        assert_eq!(queue.claim().await.unwrap().unwrap().id, fresh);
        assert_eq!(queue.poll(slow).await.unwrap().unwrap().state, JobState::Queued);

        // The original worker reports back before anyone picks it up again
        queue.complete(slow, result()).await.unwrap();
        assert!(queue.claim().await.unwrap().is_none());
        assert_eq!(queue.poll(slow).await.unwrap().unwrap().state, JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_delivery_attempts_exhausted() {
        let queue = MemoryJobQueue::new(short_lease(2));
        let id = queue.enqueue(FeatureVector::zeroed()).await.unwrap();

        queue.claim().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        queue.claim().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(queue.claim().await.unwrap().is_none());
        let status = queue.poll(id).await.unwrap().unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some(ATTEMPTS_EXHAUSTED));
    }

    #[tokio::test]
    async fn test_unbounded_lease_does_not_overflow() {
        let queue = MemoryJobQueue::new(QueueSettings { lease: Duration::MAX, max_attempts: 3 });
        let id = queue.enqueue(FeatureVector::zeroed()).await.unwrap();

        assert_eq!(queue.claim().await.unwrap().unwrap().id, id);
        assert!(queue.claim().await.unwrap().is_none());
        assert_eq!(queue.poll(id).await.unwrap().unwrap().state, JobState::Processing);
    }

    #[tokio::test]
    async fn test_purge_only_removes_old_terminal_jobs() {
        let queue = MemoryJobQueue::new(QueueSettings::default());
        let done = queue.enqueue(FeatureVector::zeroed()).await.unwrap();
        let waiting = queue.enqueue(FeatureVector::zeroed()).await.unwrap();

        let claimed = queue.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, done);
        queue.complete(done, result()).await.unwrap();

        assert_eq!(queue.purge_finished(Duration::from_secs(3600)).await.unwrap(), 0);
        assert_eq!(queue.purge_finished(Duration::ZERO).await.unwrap(), 1);
        assert!(queue.poll(done).await.unwrap().is_none());
        assert!(queue.poll(waiting).await.unwrap().is_some());
    }
}
