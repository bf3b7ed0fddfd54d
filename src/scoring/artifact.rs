//! Model artifact loading
//!
//! The artifact is a frozen logistic-regression export: identity fields, the
//! feature names it was trained on and one coefficient per feature. Loading is
//! fail-fast; anything that does not line up with the serving schema is a
//! [`ModelLoadError`].

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{feature_names, FEATURE_COUNT, FEATURE_FIELDS};

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact not found: {0}")]
    NotFound(String),

    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("model schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Serialized classifier as exported by the training pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_name: String,
    pub version: String,
    #[serde(default)]
    pub trained_on: Option<String>,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.exists() {
            return Err(ModelLoadError::NotFound(display));
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|source| ModelLoadError::Io { path: display, source })?;

        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelLoadError> {
        let artifact: ModelArtifact = serde_json::from_str(raw)?;
        artifact.check_schema()?;
        Ok(artifact)
    }

    /// Coefficients re-ordered to the serving column order
    pub fn weights(&self) -> [f64; FEATURE_COUNT] {
        let mut weights = [0.0; FEATURE_COUNT];
        for (slot, name) in weights.iter_mut().zip(feature_names()) {
            if let Some(idx) = self.feature_names.iter().position(|n| n == name) {
                *slot = self.coefficients[idx];
            }
        }
        weights
    }

    fn check_schema(&self) -> Result<(), ModelLoadError> {
        if self.coefficients.len() != self.feature_names.len() {
            return Err(ModelLoadError::SchemaMismatch(format!(
                "{} feature names but {} coefficients",
                self.feature_names.len(),
                self.coefficients.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.feature_names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(ModelLoadError::SchemaMismatch(format!("duplicate feature '{}'", dup)));
        }

        let missing: Vec<&str> = feature_names()
            .filter(|name| !seen.contains(name))
            .collect();
        let unknown: Vec<&str> = self
            .feature_names
            .iter()
            .map(|n| n.as_str())
            .filter(|n| !feature_names().any(|expected| expected == *n))
            .collect();
        if !missing.is_empty() || !unknown.is_empty() {
            return Err(ModelLoadError::SchemaMismatch(format!(
                "missing [{}], unexpected [{}]",
                missing.join(", "),
                unknown.join(", ")
            )));
        }

        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelLoadError::SchemaMismatch("non-finite weight".to_string()));
        }

        // Largest logit any in-range vector can reach
        let logit_bound = self
            .feature_names
            .iter()
            .zip(self.coefficients.iter())
            .filter_map(|(name, w)| {
                FEATURE_FIELDS
                    .iter()
                    .find(|f| f.name == name.as_str())
                    .map(|f| w.abs() * f.max.abs().max(f.min.abs()))
            })
            .fold(self.intercept.abs(), |acc, term| acc + term);
        if !logit_bound.is_finite() {
            return Err(ModelLoadError::SchemaMismatch(
                "weights overflow for in-range feature values".to_string(),
            ));
        }

        Ok(())
    }
}
