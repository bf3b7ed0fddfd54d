//! Async task status handler

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::models::JobStatus;
use crate::{AppError, AppResult, AppState};

pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<JobStatus>> {
    // Ids we never issued are simply unknown
    let id = Uuid::parse_str(&task_id).map_err(|_| AppError::JobNotFound(task_id))?;

    let status = state.orchestrator.status(id).await?;
    Ok(Json(status))
}
