//! Credit Risk Scoring Service
//!
//! Scores credit-default risk from twelve derived behavioral features and
//! serves it over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     CREDIT RISK API                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────────────────────────────┐   │
//! │  │  Router    │──►│  Orchestrator                        │   │
//! │  │  (Axum)    │   │  validate ─► cache ─► engine ─► audit│   │
//! │  └────────────┘   └───────┬──────────────┬───────────────┘   │
//! │                           │ enqueue      │                   │
//! │                           ▼              ▼                   │
//! │                   ┌─────────────┐  ┌───────────┐ ┌────────┐  │
//! │                   │ Job Queue   │  │PostgreSQL │ │ Redis  │  │
//! │                   └──────┬──────┘  └───────────┘ └────────┘  │
//! │                          ▼                                   │
//! │                   ┌─────────────┐                            │
//! │                   │ Worker Pool │──► Scoring Engine          │
//! │                   └─────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod scoring;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};

pub use error::{AppError, AppResult};
pub use orchestrator::{Orchestrator, Timeouts};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::home))
        .route("/v1/health", get(handlers::health::check))
        .route("/v1/model-info", get(handlers::health::model_info))
        .route("/v1/predict", post(handlers::predict::predict))
        .route("/v1/predict-async", post(handlers::predict::predict_async))
        .route("/v1/tasks/:task_id", get(handlers::tasks::status))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(middleware::recover::handle_panic))
        .layer(axum_middleware::from_fn(middleware::request_log::log_requests))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
