//! Database module - PostgreSQL connection and migrations

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str, acquire_timeout: Duration) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Simple query protocol so the multi-statement script runs in one call
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Audit log of synchronous predictions
CREATE TABLE IF NOT EXISTS prediction_logs (
    id BIGSERIAL PRIMARY KEY,
    avg_payment_delay DOUBLE PRECISION NOT NULL,
    max_payment_delay DOUBLE PRECISION NOT NULL,
    std_payment_delay DOUBLE PRECISION NOT NULL,
    avg_payment_ratio DOUBLE PRECISION NOT NULL,
    min_payment_ratio DOUBLE PRECISION NOT NULL,
    avg_utilization DOUBLE PRECISION NOT NULL,
    max_utilization DOUBLE PRECISION NOT NULL,
    income_low INT NOT NULL,
    income_medium INT NOT NULL,
    age_18_25 INT NOT NULL,
    age_26_35 INT NOT NULL,
    age_36_50 INT NOT NULL,
    default_probability DOUBLE PRECISION NOT NULL,
    risk_category VARCHAR(20) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Async scoring jobs
CREATE TABLE IF NOT EXISTS scoring_jobs (
    id UUID PRIMARY KEY,
    features JSONB NOT NULL,
    state VARCHAR(20) NOT NULL DEFAULT 'queued',
    result JSONB,
    error TEXT,
    attempts INT NOT NULL DEFAULT 0,
    lease_expires_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_prediction_logs_created ON prediction_logs(created_at);
CREATE INDEX IF NOT EXISTS idx_scoring_jobs_claim ON scoring_jobs(state, created_at);
CREATE INDEX IF NOT EXISTS idx_scoring_jobs_updated ON scoring_jobs(updated_at) WHERE state IN ('succeeded', 'failed');
"#;
