//! Error handling
//!
//! Every failure that reaches a handler is an [`AppError`]. Client errors
//! carry their message; server-side failures are logged here with full detail
//! and answered with a generic body.

use std::any::Any;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::FeatureError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Body could not be parsed as JSON
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// Parsed payload does not match the feature schema
    #[error(transparent)]
    Validation(#[from] FeatureError),

    #[error("task not found: {0}")]
    JobNotFound(String),

    #[error("route not found")]
    RouteNotFound,

    #[error("audit write failed: {0}")]
    AuditWrite(String),

    #[error("enqueue failed: {0}")]
    Enqueue(String),

    #[error("job store error: {0}")]
    JobStore(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MalformedBody(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            AppError::JobNotFound(_) => (StatusCode::NOT_FOUND, "Task not found".to_string()),
            AppError::RouteNotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::AuditWrite(msg) => {
                tracing::error!("Audit write error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Prediction could not be recorded".to_string())
            }
            AppError::Enqueue(msg) => {
                tracing::error!("Enqueue error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Task queue unavailable".to_string())
            }
            AppError::JobStore(msg) => {
                tracing::error!("Job store error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Task queue unavailable".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, body) = body_of(AppError::Internal("pool exhausted at db.rs:42".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
        assert!(!body.to_string().contains("db.rs"));
    }

    #[tokio::test]
    async fn test_audit_failure_is_unavailable() {
        let (status, body) = body_of(AppError::AuditWrite("connection refused".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.to_string().contains("refused"));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_validation_error_is_client_facing() {
        let err = AppError::from(FeatureError::Missing(vec!["avg_utilization".into()]));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("avg_utilization"));
        assert_eq!(body["status"], 422);
    }
}
