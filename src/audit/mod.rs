//! Audit Store - append-only log of synchronous predictions

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{FeatureVector, PredictionResult};

pub use self::memory::MemoryAuditStore;
pub use self::postgres::PgAuditStore;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    Write(String),
}

impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        AuditError::Write(err.to_string())
    }
}

/// Durable record of every served synchronous prediction
///
/// `append` returns only after the record is committed. Ids are strictly
/// increasing within a store and records are never updated or deleted.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(
        &self,
        features: &FeatureVector,
        result: &PredictionResult,
        created_at: DateTime<Utc>,
    ) -> Result<i64, AuditError>;

    fn name(&self) -> &'static str;
}
