//! HTTP handlers

pub mod health;
pub mod predict;
pub mod tasks;

use crate::error::AppError;

/// Fallback for unknown routes
pub async fn not_found() -> AppError {
    AppError::RouteNotFound
}
