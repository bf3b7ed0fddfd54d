//! PostgreSQL audit store (`prediction_logs`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{AuditError, AuditStore};
use crate::models::{FeatureVector, PredictionResult};

#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(
        &self,
        features: &FeatureVector,
        result: &PredictionResult,
        created_at: DateTime<Utc>,
    ) -> Result<i64, AuditError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO prediction_logs (
                avg_payment_delay, max_payment_delay, std_payment_delay,
                avg_payment_ratio, min_payment_ratio,
                avg_utilization, max_utilization,
                income_low, income_medium,
                age_18_25, age_26_35, age_36_50,
                default_probability, risk_category, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#
        )
        .bind(features.avg_payment_delay)
        .bind(features.max_payment_delay)
        .bind(features.std_payment_delay)
        .bind(features.avg_payment_ratio)
        .bind(features.min_payment_ratio)
        .bind(features.avg_utilization)
        .bind(features.max_utilization)
        .bind(features.income_low)
        .bind(features.income_medium)
        .bind(features.age_18_25)
        .bind(features.age_26_35)
        .bind(features.age_36_50)
        .bind(result.default_probability)
        .bind(result.risk_category.as_str())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
