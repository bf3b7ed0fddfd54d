//! Audit record model

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FeatureVector, PredictionResult};

/// One committed synchronous prediction
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub features: FeatureVector,
    pub result: PredictionResult,
    pub created_at: DateTime<Utc>,
}
