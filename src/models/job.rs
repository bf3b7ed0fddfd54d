//! Async scoring job model

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FeatureVector, PredictionResult};

pub type JobId = Uuid;

/// Lifecycle of an async job
///
/// `queued -> processing -> succeeded | failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobState::Queued),
            "processing" => Ok(JobState::Processing),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state '{}'", other)),
        }
    }
}

/// Snapshot returned by a status poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub task_id: JobId,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: i32,
    pub updated_at: DateTime<Utc>,
}

/// A job handed to a worker under a lease
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: JobId,
    pub features: FeatureVector,
    pub attempts: i32,
}

/// Immediate acknowledgment for `POST /v1/predict-async`
#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub task_id: JobId,
    pub status: &'static str,
    pub state: JobState,
}

impl EnqueueResponse {
    pub fn queued(task_id: JobId) -> Self {
        Self {
            task_id,
            status: "Processing",
            state: JobState::Queued,
        }
    }
}
