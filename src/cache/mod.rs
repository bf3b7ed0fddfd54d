//! Fingerprint & Cache
//!
//! Predictions are memoized under a content hash of the feature vector.
//! Scoring is pure, so the cache is strictly an optimization: every backend
//! error is reported to the caller, who treats it as a miss.

pub mod memory;
pub mod noop;
pub mod redis_cache;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::models::{feature_names, FeatureVector};

pub use self::memory::MemoryCache;
pub use self::noop::NoopCache;
pub use self::redis_cache::RedisCache;

/// Length of a fingerprint in hex characters
pub const FINGERPRINT_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Key-value store with per-entry expiration
///
/// Values are JSON strings. An expired entry must read as absent.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Backend name for logs and status output
    fn name(&self) -> &'static str;
}

/// Stable content hash of a feature vector
///
/// Fields are serialized sorted by name with every value widened to f64, so
/// key order and `1` vs `1.0` spellings hash identically.
pub fn fingerprint(features: &FeatureVector) -> String {
    let canonical: BTreeMap<&str, f64> = feature_names()
        .zip(features.as_array())
        .collect();

    let mut hasher = Sha256::new();
    for (name, value) in &canonical {
        // -0.0 and 0.0 are the same feature value
        let value = if *value == 0.0 { 0.0 } else { *value };
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_bits().to_be_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const ORDERED: &str = r#"{
        "avg_payment_delay": 3.0, "max_payment_delay": 10, "std_payment_delay": 1.5,
        "avg_payment_ratio": 0.9, "min_payment_ratio": 0.5,
        "avg_utilization": 0.3, "max_utilization": 0.55,
        "income_low": 1, "income_medium": 0,
        "age_18_25": 0, "age_26_35": 0, "age_36_50": 1
    }"#;

    const SHUFFLED: &str = r#"{
        "age_36_50": 1, "income_medium": 0, "max_utilization": 0.55,
        "avg_payment_ratio": 0.9, "age_26_35": 0, "std_payment_delay": 1.5,
        "income_low": 1, "avg_utilization": 0.3, "max_payment_delay": 10.0,
        "min_payment_ratio": 0.5, "age_18_25": 0, "avg_payment_delay": 3
    }"#;

    fn parse(raw: &str) -> FeatureVector {
        let value: Value = serde_json::from_str(raw).unwrap();
        FeatureVector::from_json(value).unwrap()
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        assert_eq!(fingerprint(&parse(ORDERED)), fingerprint(&parse(SHUFFLED)));
    }

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let fp = fingerprint(&parse(ORDERED));
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_distinguishes_values() {
        let a = parse(ORDERED);
        let mut b = a.clone();
        b.avg_utilization = 0.31;
        assert_ne!(fingerprint(&a), fingerprint(&b));

        let mut c = a.clone();
        c.income_low = 0;
        c.income_medium = 1;
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_fingerprint_is_stable_across_calls() {
        let v = FeatureVector::zeroed();
        assert_eq!(fingerprint(&v), fingerprint(&v.clone()));
    }
}
