//! Prediction handlers

use axum::{extract::State, Json};

use crate::middleware::features::ValidFeatures;
use crate::models::{EnqueueResponse, PredictResponse};
use crate::{AppResult, AppState};

/// Score synchronously, returning the audit record id
pub async fn predict(
    State(state): State<AppState>,
    ValidFeatures(features): ValidFeatures,
) -> AppResult<Json<PredictResponse>> {
    let response = state.orchestrator.predict(features).await?;
    Ok(Json(response))
}

/// Queue a scoring job and acknowledge immediately
pub async fn predict_async(
    State(state): State<AppState>,
    ValidFeatures(features): ValidFeatures,
) -> AppResult<Json<EnqueueResponse>> {
    let ack = state.orchestrator.submit(features).await?;
    Ok(Json(ack))
}
