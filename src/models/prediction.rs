//! Prediction result model

use serde::{Deserialize, Serialize};

/// Risk bucket derived from the default probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Medium => "Medium Risk",
            RiskCategory::High => "High Risk",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one scoring call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub default_probability: f64,
    pub risk_category: RiskCategory,
}

impl PredictionResult {
    /// Credit score on the 300-900 scale: `900 - 600 * p`, truncated
    pub fn credit_score(&self) -> i32 {
        (900.0 - self.default_probability * 600.0) as i32
    }

    pub fn credit_band(&self) -> CreditBand {
        CreditBand::from_score(self.credit_score())
    }
}

/// Reporting band for a credit score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditBand {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "Very Risky")]
    VeryRisky,
}

impl CreditBand {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 800 => CreditBand::Excellent,
            s if s >= 700 => CreditBand::Good,
            s if s >= 600 => CreditBand::Fair,
            s if s >= 500 => CreditBand::Poor,
            _ => CreditBand::VeryRisky,
        }
    }
}

/// Body of a synchronous prediction response; also the cached value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub default_probability: f64,
    pub risk_category: RiskCategory,
    pub saved_record_id: i64,
    pub credit_score: i32,
    pub credit_band: CreditBand,
}

impl PredictResponse {
    pub fn new(result: PredictionResult, saved_record_id: i64) -> Self {
        Self {
            default_probability: result.default_probability,
            risk_category: result.risk_category,
            saved_record_id,
            credit_score: result.credit_score(),
            credit_band: result.credit_band(),
        }
    }

    pub fn result(&self) -> PredictionResult {
        PredictionResult {
            default_probability: self.default_probability,
            risk_category: self.risk_category,
        }
    }
}
