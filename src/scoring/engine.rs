//! Scoring Engine
//!
//! Wraps one loaded [`ModelArtifact`] and turns a [`FeatureVector`] into a
//! default probability and risk category.
//!
//! Scoring is side-effect-free: output depends only on the input vector and
//! the artifact, and nothing outside the engine is touched. Async jobs are
//! delivered at least once and rely on this to make re-execution safe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use super::artifact::ModelArtifact;
use crate::models::{FeatureVector, PredictionResult, RiskCategory, FEATURE_COUNT};

/// Probability above which a user is High risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.70;

/// Probability above which a user is at least Medium risk
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.30;

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("model produced a non-finite probability for the given features")]
    NonFinite,
}

/// Map a probability to its risk bucket
pub fn categorize(probability: f64) -> RiskCategory {
    if probability > HIGH_RISK_THRESHOLD {
        RiskCategory::High
    } else if probability > MEDIUM_RISK_THRESHOLD {
        RiskCategory::Medium
    } else {
        RiskCategory::Low
    }
}

/// Identity and usage of the loaded model
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub model_name: String,
    pub version: String,
    pub trained_on: Option<String>,
    pub features_used: usize,
    pub inference_count: u64,
    pub avg_latency_ms: f64,
}

/// Read-only scoring service, built once at startup and shared by `Arc`
#[derive(Debug)]
pub struct ScoringEngine {
    artifact: ModelArtifact,
    weights: [f64; FEATURE_COUNT],
    inference_count: AtomicU64,
    latency_sum_us: AtomicU64,
}

impl ScoringEngine {
    pub fn new(artifact: ModelArtifact) -> Self {
        let weights = artifact.weights();
        Self {
            artifact,
            weights,
            inference_count: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
        }
    }

    /// Default probability for one feature vector
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let started = Instant::now();

        let logit = features
            .as_array()
            .iter()
            .zip(self.weights.iter())
            .fold(self.artifact.intercept, |acc, (x, w)| acc + x * w);
        let probability = 1.0 / (1.0 + (-logit).exp());

        self.inference_count.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);

        probability
    }

    pub fn categorize(&self, probability: f64) -> RiskCategory {
        categorize(probability)
    }

    /// Score and categorize. Vectors inside the validated feature ranges always
    /// score finitely; `NonFinite` only surfaces for vectors built elsewhere.
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, ScoringError> {
        let probability = self.score(features);
        if !probability.is_finite() {
            return Err(ScoringError::NonFinite);
        }

        Ok(PredictionResult {
            default_probability: probability,
            risk_category: categorize(probability),
        })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Number of `score` calls since startup
    pub fn inference_count(&self) -> u64 {
        self.inference_count.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> EngineStatus {
        let count = self.inference_count();
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f64 / count as f64) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_name: self.artifact.model_name.clone(),
            version: self.artifact.version.clone(),
            trained_on: self.artifact.trained_on.clone(),
            features_used: self.artifact.feature_names.len(),
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::REAL_FEATURE_MAX;
    use crate::scoring::artifact::tests::sample_artifact;

    fn engine() -> ScoringEngine {
        let artifact = ModelArtifact::from_json(&sample_artifact().to_string()).unwrap();
        ScoringEngine::new(artifact)
    }

    fn high_risk_vector() -> FeatureVector {
        FeatureVector {
            avg_payment_delay: 90.0,
            max_payment_delay: 120.0,
            avg_payment_ratio: 0.1,
            avg_utilization: 0.95,
            ..FeatureVector::zeroed()
        }
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(categorize(0.70), RiskCategory::Medium);
        assert_eq!(categorize(0.7000001), RiskCategory::High);
        assert_eq!(categorize(0.30), RiskCategory::Low);
        assert_eq!(categorize(0.3000001), RiskCategory::Medium);
        assert_eq!(categorize(0.0), RiskCategory::Low);
        assert_eq!(categorize(1.0), RiskCategory::High);
    }

    #[test]
    fn test_category_is_monotone() {
        let mut previous = RiskCategory::Low;
        for step in 0..=1000 {
            let category = categorize(step as f64 / 1000.0);
            assert!(category >= previous, "category dropped at p={}", step as f64 / 1000.0);
            previous = category;
        }
    }

    #[test]
    fn test_score_is_deterministic() {
        let engine = engine();
        let v = high_risk_vector();
        assert_eq!(engine.score(&v), engine.score(&v));
    }

    #[test]
    fn test_zero_vector_is_low_risk() {
        let result = engine().predict(&FeatureVector::zeroed()).unwrap();
        assert!(result.default_probability < 0.30);
        assert_eq!(result.risk_category, RiskCategory::Low);
    }

    #[test]
    fn test_delinquent_profile_is_high_risk() {
        let result = engine().predict(&high_risk_vector()).unwrap();
        assert!(result.default_probability > 0.70);
        assert_eq!(result.risk_category, RiskCategory::High);
    }

    #[test]
    fn test_probability_in_unit_interval() {
        let engine = engine();
        let extreme = FeatureVector {
            avg_payment_ratio: 1e6,
            ..FeatureVector::zeroed()
        };
        let p = engine.score(&extreme);
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_bounds_of_validated_input_score_finitely() {
        let engine = engine();
        let ceiling = FeatureVector {
            avg_payment_delay: REAL_FEATURE_MAX,
            max_payment_delay: REAL_FEATURE_MAX,
            std_payment_delay: REAL_FEATURE_MAX,
            avg_payment_ratio: REAL_FEATURE_MAX,
            min_payment_ratio: REAL_FEATURE_MAX,
            avg_utilization: REAL_FEATURE_MAX,
            max_utilization: REAL_FEATURE_MAX,
            income_low: 1,
            income_medium: 1,
            age_18_25: 1,
            age_26_35: 1,
            age_36_50: 1,
        };
        assert!(engine.predict(&ceiling).is_ok());

        let ratios_only = FeatureVector {
            avg_payment_ratio: REAL_FEATURE_MAX,
            min_payment_ratio: REAL_FEATURE_MAX,
            ..FeatureVector::zeroed()
        };
        assert_eq!(engine.predict(&ratios_only).unwrap().risk_category, RiskCategory::Low);
    }

    #[test]
    fn test_inference_counter() {
        let engine = engine();
        assert_eq!(engine.inference_count(), 0);
        engine.predict(&FeatureVector::zeroed()).unwrap();
        engine.predict(&FeatureVector::zeroed()).unwrap();
        assert_eq!(engine.inference_count(), 2);
        assert_eq!(engine.status().inference_count, 2);
        assert_eq!(engine.status().features_used, 12);
    }
}
