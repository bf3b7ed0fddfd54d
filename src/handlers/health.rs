//! Liveness, health and model info handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HomeResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
}

#[derive(Serialize)]
pub struct ModelInfoResponse {
    model_name: String,
    version: String,
    trained_on: Option<String>,
    features_used: usize,
    status: &'static str,
    timestamp: i64,
    inference_count: u64,
    avg_latency_ms: f64,
}

pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Credit Risk API is running",
    })
}

/// The engine is loaded before the router exists, so a serving process is
/// always healthy from the model's point of view.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: true,
    })
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let engine = state.orchestrator.engine().status();

    Json(ModelInfoResponse {
        model_name: engine.model_name,
        version: engine.version,
        trained_on: engine.trained_on,
        features_used: engine.features_used,
        status: "ready",
        timestamp: chrono::Utc::now().timestamp(),
        inference_count: engine.inference_count,
        avg_latency_ms: engine.avg_latency_ms,
    })
}
