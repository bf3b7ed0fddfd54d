//! Credit Risk API server
//!
//! Loads the model, wires the cache, audit store and job queue, starts the
//! in-process scoring workers and serves the HTTP API.

use std::net::SocketAddr;

use anyhow::Context;

use credit_risk_api::{bootstrap, config, create_router, queue::WorkerPool, AppState, Orchestrator, Timeouts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    bootstrap::init_tracing();
    let config = config::Config::from_env();

    tracing::info!("Credit Risk API starting ({})...", config.environment);

    // A missing or mismatched model is fatal: never serve without it
    let engine = bootstrap::load_engine(&config).context("Failed to load model artifact")?;

    let pool = bootstrap::connect_database(&config).await?;
    let cache = bootstrap::connect_cache(&config).await;
    let audit = bootstrap::audit_store(&config, pool.as_ref())?;
    let queue = bootstrap::job_queue(&config, pool.as_ref())?;

    let workers = (config.worker_count > 0)
        .then(|| WorkerPool::spawn(queue.clone(), engine.clone(), config.worker_settings()));

    let orchestrator = Orchestrator::new(
        engine,
        cache,
        audit,
        queue,
        config.cache_ttl,
        Timeouts {
            cache: config.cache_timeout,
            store: config.store_timeout,
            queue: config.queue_timeout,
        },
    );

    // Build router
    let app = create_router(AppState { orchestrator });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(bootstrap::shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(workers) = workers {
        workers.shutdown().await;
    }
    Ok(())
}
