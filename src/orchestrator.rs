//! Request Orchestrator
//!
//! Drives the two serving paths once a payload has been validated:
//!
//! ```text
//!  sync:   fingerprint ─► cache ─hit──────────────────────────────► response
//!                           └─miss─► engine ─► audit ─► cache fill ─► response
//!  async:  enqueue ─► { task_id, queued }
//! ```
//!
//! Cache trouble only costs memoization. Audit and queue failures fail the
//! request, since their ids are part of the response contract.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::audit::AuditStore;
use crate::cache::{fingerprint, Cache, CacheError};
use crate::error::{AppError, AppResult};
use crate::models::{EnqueueResponse, FeatureVector, JobId, JobStatus, PredictResponse};
use crate::queue::{JobQueue, QueueError};
use crate::scoring::ScoringEngine;

/// Per-backend call budgets
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub cache: Duration,
    pub store: Duration,
    pub queue: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            cache: Duration::from_millis(250),
            store: Duration::from_secs(2),
            queue: Duration::from_secs(2),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    engine: Arc<ScoringEngine>,
    cache: Arc<dyn Cache>,
    audit: Arc<dyn AuditStore>,
    queue: Arc<dyn JobQueue>,
    cache_ttl: Duration,
    timeouts: Timeouts,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<ScoringEngine>,
        cache: Arc<dyn Cache>,
        audit: Arc<dyn AuditStore>,
        queue: Arc<dyn JobQueue>,
        cache_ttl: Duration,
        timeouts: Timeouts,
    ) -> Self {
        Self { engine, cache, audit, queue, cache_ttl, timeouts }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Synchronous prediction with memoization and audit
    pub async fn predict(&self, features: FeatureVector) -> AppResult<PredictResponse> {
        let key = fingerprint(&features);

        if let Some(cached) = self.cache_lookup(&key).await {
            tracing::info!("Cache hit for {}", &key[..12]);
            return Ok(cached);
        }
        tracing::info!("Cache miss for {}, running model", &key[..12]);

        let result = self
            .engine
            .predict(&features)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let record_id = tokio::time::timeout(
            self.timeouts.store,
            self.audit.append(&features, &result, Utc::now()),
        )
        .await
        .map_err(|_| AppError::AuditWrite(format!("timed out after {:?}", self.timeouts.store)))?
        .map_err(|e| AppError::AuditWrite(e.to_string()))?;

        let response = PredictResponse::new(result, record_id);
        self.cache_fill(&key, &response).await;

        Ok(response)
    }

    /// Accept a job and return without scoring
    pub async fn submit(&self, features: FeatureVector) -> AppResult<EnqueueResponse> {
        let task_id = tokio::time::timeout(self.timeouts.queue, self.queue.enqueue(features))
            .await
            .map_err(|_| AppError::Enqueue(format!("timed out after {:?}", self.timeouts.queue)))?
            .map_err(|e| AppError::Enqueue(e.to_string()))?;

        tracing::info!("Queued scoring job {}", task_id);
        Ok(EnqueueResponse::queued(task_id))
    }

    pub async fn status(&self, task_id: JobId) -> AppResult<JobStatus> {
        let status = tokio::time::timeout(self.timeouts.queue, self.queue.poll(task_id))
            .await
            .map_err(|_| AppError::JobStore(QueueError::Timeout(self.timeouts.queue).to_string()))?
            .map_err(|e| AppError::JobStore(e.to_string()))?;

        status.ok_or_else(|| AppError::JobNotFound(task_id.to_string()))
    }

    async fn cache_lookup(&self, key: &str) -> Option<PredictResponse> {
        let raw = match tokio::time::timeout(self.timeouts.cache, self.cache.get(key)).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(e)) => {
                tracing::warn!("Cache read failed ({}), treating as miss", e);
                return None;
            }
            Err(_) => {
                tracing::warn!("{}, treating as miss", CacheError::Timeout(self.timeouts.cache));
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn cache_fill(&self, key: &str, response: &PredictResponse) {
        let value = match serde_json::to_string(response) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Skipping cache fill, encode failed: {}", e);
                return;
            }
        };

        match tokio::time::timeout(self.timeouts.cache, self.cache.set(key, value, self.cache_ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Cache fill skipped: {}", e),
            Err(_) => tracing::warn!("Cache fill skipped: {}", CacheError::Timeout(self.timeouts.cache)),
        }
    }
}
