//! Standalone scoring worker
//!
//! Drains the PostgreSQL job queue independently of the API processes, so
//! async throughput scales separately from request handling.

use anyhow::{bail, Context};

use credit_risk_api::{bootstrap, config::{Backend, Config}, queue::WorkerPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    bootstrap::init_tracing();
    let config = Config::from_env();

    if config.queue_backend != Backend::Postgres {
        bail!("standalone workers need QUEUE_BACKEND=postgres; the in-memory queue lives inside the API process");
    }
    if config.worker_count == 0 {
        bail!("WORKER_COUNT must be at least 1");
    }

    let engine = bootstrap::load_engine(&config).context("Failed to load model artifact")?;
    let pool = bootstrap::connect_database(&config).await?;
    let queue = bootstrap::job_queue(&config, pool.as_ref())?;

    tracing::info!("Credit Risk worker starting with {} task(s)", config.worker_count);
    let workers = WorkerPool::spawn(queue, engine, config.worker_settings());

    bootstrap::shutdown_signal().await;
    workers.shutdown().await;
    Ok(())
}
