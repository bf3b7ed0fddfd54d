//! PostgreSQL job queue (`scoring_jobs`)
//!
//! Claims use `FOR UPDATE SKIP LOCKED`, so any number of API processes and
//! standalone workers can share one table without handing a job to two
//! workers inside the same lease.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{JobQueue, QueueError, QueueSettings, ATTEMPTS_EXHAUSTED};
use crate::models::{ClaimedJob, FeatureVector, JobId, JobState, JobStatus, PredictionResult};

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    state: String,
    result: Option<Json<PredictionResult>>,
    error: Option<String>,
    attempts: i32,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_status(self) -> Result<JobStatus, QueueError> {
        let state: JobState = self.state.parse().map_err(|reason| QueueError::Corrupt {
            id: self.id,
            reason,
        })?;

        Ok(JobStatus {
            task_id: self.id,
            state,
            result: self.result.map(|r| r.0),
            error: self.error,
            attempts: self.attempts,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ClaimRow {
    id: Uuid,
    features: Json<FeatureVector>,
    attempts: i32,
}

/// Lease the oldest deliverable job. A lapsed lease is only redelivered while
/// attempts remain, so a lease expiring after `fail_exhausted` ran cannot push
/// a job past `max_attempts`.
const CLAIM_NEXT: &str = r#"
    UPDATE scoring_jobs
    SET state = 'processing',
        attempts = attempts + 1,
        lease_expires_at = NOW() + make_interval(secs => $1),
        updated_at = NOW()
    WHERE id = (
        SELECT id FROM scoring_jobs
        WHERE state = 'queued'
           OR (state = 'processing' AND lease_expires_at < NOW() AND attempts < $2)
        ORDER BY created_at
        LIMIT 1
        FOR UPDATE SKIP LOCKED
    )
    RETURNING id, features, attempts
"#;

#[derive(Debug, Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    settings: QueueSettings,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, settings: QueueSettings) -> Self {
        Self { pool, settings }
    }

    /// Fail processing jobs whose lease expired on their last allowed delivery
    async fn fail_exhausted(&self) -> Result<u64, QueueError> {
        let done = sqlx::query(
            r#"
            UPDATE scoring_jobs
            SET state = 'failed', error = $1, lease_expires_at = NULL, updated_at = NOW()
            WHERE state = 'processing' AND lease_expires_at < NOW() AND attempts >= $2
            "#
        )
        .bind(ATTEMPTS_EXHAUSTED)
        .bind(self.settings.max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected())
    }

    async fn finish(
        &self,
        id: JobId,
        state: JobState,
        result: Option<PredictionResult>,
        error: Option<String>,
    ) -> Result<(), QueueError> {
        let updated = sqlx::query(
            r#"
            UPDATE scoring_jobs
            SET state = $2, result = $3, error = $4, lease_expires_at = NULL, updated_at = NOW()
            WHERE id = $1 AND state IN ('queued', 'processing')
            "#
        )
        .bind(id)
        .bind(state.as_str())
        .bind(result.map(Json))
        .bind(error)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            tracing::debug!("Job {} already finished or purged, ignoring {}", id, state);
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, features: FeatureVector) -> Result<JobId, QueueError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO scoring_jobs (id, features, state) VALUES ($1, $2, 'queued')")
            .bind(id)
            .bind(Json(&features))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn poll(&self, id: JobId) -> Result<Option<JobStatus>, QueueError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, state, result, error, attempts, updated_at FROM scoring_jobs WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_status).transpose()
    }

    async fn claim(&self) -> Result<Option<ClaimedJob>, QueueError> {
        let exhausted = self.fail_exhausted().await?;
        if exhausted > 0 {
            tracing::warn!("Failed {} job(s) after exhausting delivery attempts", exhausted);
        }

        let row = sqlx::query_as::<_, ClaimRow>(CLAIM_NEXT)
            .bind(self.settings.lease.as_secs_f64())
            .bind(self.settings.max_attempts)
            .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ClaimedJob {
            id: r.id,
            features: r.features.0,
            attempts: r.attempts,
        }))
    }

    async fn complete(&self, id: JobId, result: PredictionResult) -> Result<(), QueueError> {
        self.finish(id, JobState::Succeeded, Some(result), None).await
    }

    async fn fail(&self, id: JobId, error: String) -> Result<(), QueueError> {
        self.finish(id, JobState::Failed, None, Some(error)).await
    }

    async fn purge_finished(&self, older_than: Duration) -> Result<u64, QueueError> {
        let done = sqlx::query(
            r#"
            DELETE FROM scoring_jobs
            WHERE state IN ('succeeded', 'failed')
              AND updated_at < NOW() - make_interval(secs => $1)
            "#
        )
        .bind(older_than.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
