//! Feature payload extractor
//!
//! Parses the body as JSON and checks it against the feature field table
//! before any handler code runs. Rejections never reach the cache, engine,
//! audit store or queue.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde_json::Value;

use crate::error::AppError;
use crate::models::FeatureVector;

/// A request body that passed feature validation
#[derive(Debug, Clone)]
pub struct ValidFeatures(pub FeatureVector);

#[axum::async_trait]
impl<S> FromRequest<S> for ValidFeatures
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<Value>::from_request(req, state).await?;

        match FeatureVector::from_json(payload) {
            Ok(features) => Ok(ValidFeatures(features)),
            Err(e) => {
                tracing::debug!("Rejected feature payload: {}", e);
                Err(AppError::Validation(e))
            }
        }
    }
}
