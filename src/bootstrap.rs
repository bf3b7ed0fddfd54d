//! Process startup shared by the API server and the standalone worker

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::audit::{AuditStore, MemoryAuditStore, PgAuditStore};
use crate::cache::{Cache, MemoryCache, NoopCache, RedisCache};
use crate::config::{Backend, Config};
use crate::db;
use crate::queue::{JobQueue, MemoryJobQueue, PgJobQueue};
use crate::scoring::{ModelArtifact, ModelLoadError, ScoringEngine};

/// Initialize logging; `LOG_FORMAT=json` switches to JSON lines
pub fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "credit_risk_api=debug,tower_http=info".into()))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Load the model artifact. Any failure here must stop the process.
pub fn load_engine(config: &Config) -> Result<Arc<ScoringEngine>, ModelLoadError> {
    let artifact = ModelArtifact::load(&config.model_path)?;
    tracing::info!(
        "Model loaded from {}: {} v{} ({} features)",
        config.model_path,
        artifact.model_name,
        artifact.version,
        artifact.feature_names.len()
    );
    Ok(Arc::new(ScoringEngine::new(artifact)))
}

/// Shared cache if reachable, in-process cache if none is configured,
/// always-miss cache if the configured one is down
pub async fn connect_cache(config: &Config) -> Arc<dyn Cache> {
    let Some(url) = config.redis_url.as_deref() else {
        tracing::info!("REDIS_URL not set, using in-process cache");
        let cache = Arc::new(MemoryCache::new());
        spawn_cache_sweeper(cache.clone(), config.cache_ttl.min(Duration::from_secs(60)));
        return cache;
    };

    match RedisCache::connect(url, config.cache_timeout).await {
        Ok(cache) => {
            tracing::info!("Connected to Redis cache");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!("Redis cache unavailable ({}), serving without memoization", e);
            Arc::new(NoopCache)
        }
    }
}

/// Periodically drop expired entries nobody read again
fn spawn_cache_sweeper(cache: Arc<MemoryCache>, every: Duration) {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            let removed = cache.purge_expired();
            if removed > 0 {
                tracing::debug!("Evicted {} expired cache entries", removed);
            }
        }
    });
}

/// Connect and migrate when any backend lives in PostgreSQL
pub async fn connect_database(config: &Config) -> anyhow::Result<Option<PgPool>> {
    if !config.needs_database() {
        return Ok(None);
    }

    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    let pool = db::create_pool(&config.database_url, config.store_timeout)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(Some(pool))
}

pub fn audit_store(config: &Config, pool: Option<&PgPool>) -> anyhow::Result<Arc<dyn AuditStore>> {
    let store: Arc<dyn AuditStore> = match config.store_backend {
        Backend::Postgres => Arc::new(PgAuditStore::new(
            pool.cloned().context("postgres audit store needs a database pool")?,
        )),
        Backend::Memory => {
            if config.is_production() {
                tracing::warn!("In-memory audit store in production: records are lost on restart");
            }
            Arc::new(MemoryAuditStore::new())
        }
    };
    tracing::info!("Audit store: {}", store.name());
    Ok(store)
}

pub fn job_queue(config: &Config, pool: Option<&PgPool>) -> anyhow::Result<Arc<dyn JobQueue>> {
    let queue: Arc<dyn JobQueue> = match config.queue_backend {
        Backend::Postgres => Arc::new(PgJobQueue::new(
            pool.cloned().context("postgres job queue needs a database pool")?,
            config.queue_settings(),
        )),
        Backend::Memory => Arc::new(MemoryJobQueue::new(config.queue_settings())),
    };
    tracing::info!("Job queue: {}", queue.name());
    Ok(queue)
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
