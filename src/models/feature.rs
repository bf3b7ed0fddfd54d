//! Feature vector model
//!
//! The twelve derived behavioral features the scoring model consumes. Payloads
//! are checked against [`FEATURE_FIELDS`] before they are turned into a
//! [`FeatureVector`], so downstream code never sees a partially filled vector.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// How a field is represented on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any JSON number, widened to f64
    Real,
    /// JSON integer, one-hot 0/1
    Indicator,
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            FieldKind::Real => "a number",
            FieldKind::Indicator => "an integer",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Real => value.is_number(),
            FieldKind::Indicator => value.is_i64() || value.is_u64(),
        }
    }
}

/// One row of the field-constraint table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub min: f64,
    pub max: f64,
}

/// Upper bound for every real-valued feature. Keeps the weighted sum finite.
pub const REAL_FEATURE_MAX: f64 = 1_000_000.0;

const fn real(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Real, required: true, min: 0.0, max: REAL_FEATURE_MAX }
}

const fn indicator(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Indicator, required: true, min: 0.0, max: 1.0 }
}

/// Number of features the scoring model expects
pub const FEATURE_COUNT: usize = 12;

/// Declared serving schema, in model column order
pub const FEATURE_FIELDS: [FieldSpec; FEATURE_COUNT] = [
    real("avg_payment_delay"),
    real("max_payment_delay"),
    real("std_payment_delay"),
    real("avg_payment_ratio"),
    real("min_payment_ratio"),
    real("avg_utilization"),
    real("max_utilization"),
    indicator("income_low"),
    indicator("income_medium"),
    indicator("age_18_25"),
    indicator("age_26_35"),
    indicator("age_36_50"),
];

/// Field names in model column order
pub fn feature_names() -> impl Iterator<Item = &'static str> {
    FEATURE_FIELDS.iter().map(|f| f.name)
}

/// Why a feature payload was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("missing required field(s): {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("unexpected field(s): {}", .0.join(", "))]
    Unexpected(Vec<String>),

    #[error("field '{field}' must be {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Validated input to the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FeatureVector {
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub avg_payment_delay: f64,
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub max_payment_delay: f64,
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub std_payment_delay: f64,

    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub avg_payment_ratio: f64,
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub min_payment_ratio: f64,

    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub avg_utilization: f64,
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub max_utilization: f64,

    #[validate(range(min = 0, max = 1))]
    pub income_low: i32,
    #[validate(range(min = 0, max = 1))]
    pub income_medium: i32,

    #[validate(range(min = 0, max = 1))]
    pub age_18_25: i32,
    #[validate(range(min = 0, max = 1))]
    pub age_26_35: i32,
    #[validate(range(min = 0, max = 1))]
    pub age_36_50: i32,
}

impl FeatureVector {
    /// Check a raw JSON payload against the field table and build a vector.
    pub fn from_json(payload: Value) -> Result<Self, FeatureError> {
        let Value::Object(map) = payload else {
            return Err(FeatureError::NotAnObject);
        };
        Self::from_map(map)
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self, FeatureError> {
        let mut unexpected: Vec<String> = map
            .keys()
            .filter(|k| !FEATURE_FIELDS.iter().any(|f| f.name == k.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            unexpected.sort();
            return Err(FeatureError::Unexpected(unexpected));
        }

        let missing: Vec<String> = FEATURE_FIELDS
            .iter()
            .filter(|f| f.required && !map.contains_key(f.name))
            .map(|f| f.name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FeatureError::Missing(missing));
        }

        for spec in FEATURE_FIELDS.iter() {
            if let Some(value) = map.get(spec.name) {
                if !spec.kind.accepts(value) {
                    return Err(FeatureError::WrongType {
                        field: spec.name.to_string(),
                        expected: spec.kind.describe(),
                    });
                }
                if let Some(x) = value.as_f64() {
                    if !(spec.min..=spec.max).contains(&x) {
                        return Err(FeatureError::OutOfRange(format!(
                            "{} must be between {} and {}",
                            spec.name, spec.min, spec.max
                        )));
                    }
                }
            }
        }

        // Indicators outside i32 pass the type check but fail here
        let vector: FeatureVector = serde_json::from_value(Value::Object(map))
            .map_err(|e| FeatureError::OutOfRange(e.to_string()))?;

        vector
            .validate()
            .map_err(|e| FeatureError::OutOfRange(e.to_string().replace('\n', "; ")))?;

        Ok(vector)
    }

    /// Values in model column order
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.avg_payment_delay,
            self.max_payment_delay,
            self.std_payment_delay,
            self.avg_payment_ratio,
            self.min_payment_ratio,
            self.avg_utilization,
            self.max_utilization,
            f64::from(self.income_low),
            f64::from(self.income_medium),
            f64::from(self.age_18_25),
            f64::from(self.age_26_35),
            f64::from(self.age_36_50),
        ]
    }

    /// All-zero vector
    pub fn zeroed() -> Self {
        Self {
            avg_payment_delay: 0.0,
            max_payment_delay: 0.0,
            std_payment_delay: 0.0,
            avg_payment_ratio: 0.0,
            min_payment_ratio: 0.0,
            avg_utilization: 0.0,
            max_utilization: 0.0,
            income_low: 0,
            income_medium: 0,
            age_18_25: 0,
            age_26_35: 0,
            age_36_50: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "avg_payment_delay": 4.5,
            "max_payment_delay": 12,
            "std_payment_delay": 2.1,
            "avg_payment_ratio": 0.85,
            "min_payment_ratio": 0.4,
            "avg_utilization": 0.35,
            "max_utilization": 0.6,
            "income_low": 0,
            "income_medium": 1,
            "age_18_25": 0,
            "age_26_35": 1,
            "age_36_50": 0
        })
    }

    #[test]
    fn test_valid_payload_builds_vector() {
        let v = FeatureVector::from_json(valid_payload()).unwrap();
        assert_eq!(v.max_payment_delay, 12.0);
        assert_eq!(v.income_medium, 1);
        assert_eq!(v.as_array()[7], 0.0);
        assert_eq!(v.as_array()[8], 1.0);
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("avg_utilization");

        let err = FeatureVector::from_json(payload).unwrap_err();
        assert_eq!(err, FeatureError::Missing(vec!["avg_utilization".to_string()]));
    }

    #[test]
    fn test_extra_field_rejected() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().insert("income_high".into(), json!(1));

        let err = FeatureVector::from_json(payload).unwrap_err();
        assert_eq!(err, FeatureError::Unexpected(vec!["income_high".to_string()]));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut payload = valid_payload();
        payload["avg_payment_ratio"] = json!("0.85");
        assert!(matches!(
            FeatureVector::from_json(payload).unwrap_err(),
            FeatureError::WrongType { ref field, .. } if field == "avg_payment_ratio"
        ));

        let mut payload = valid_payload();
        payload["age_18_25"] = json!(0.5);
        assert!(matches!(
            FeatureVector::from_json(payload).unwrap_err(),
            FeatureError::WrongType { ref field, .. } if field == "age_18_25"
        ));

        let mut payload = valid_payload();
        payload["income_low"] = json!(true);
        assert!(matches!(
            FeatureVector::from_json(payload).unwrap_err(),
            FeatureError::WrongType { .. }
        ));

        let mut payload = valid_payload();
        payload["max_utilization"] = Value::Null;
        assert!(matches!(
            FeatureVector::from_json(payload).unwrap_err(),
            FeatureError::WrongType { .. }
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut payload = valid_payload();
        payload["income_low"] = json!(2);
        assert!(matches!(
            FeatureVector::from_json(payload).unwrap_err(),
            FeatureError::OutOfRange(_)
        ));

        let mut payload = valid_payload();
        payload["avg_payment_delay"] = json!(-3.0);
        assert!(matches!(
            FeatureVector::from_json(payload).unwrap_err(),
            FeatureError::OutOfRange(_)
        ));
    }

    #[test]
    fn test_huge_real_rejected() {
        let mut payload = valid_payload();
        payload["avg_utilization"] = json!(1e308);

        let err = FeatureVector::from_json(payload).unwrap_err();
        assert!(matches!(err, FeatureError::OutOfRange(ref msg) if msg.contains("avg_utilization")));

        let mut payload = valid_payload();
        payload["max_payment_delay"] = json!(REAL_FEATURE_MAX);
        assert!(FeatureVector::from_json(payload).is_ok());
    }

    #[test]
    fn test_validator_bounds_match_table() {
        let over = FeatureVector { avg_payment_ratio: REAL_FEATURE_MAX * 2.0, ..FeatureVector::zeroed() };
        assert!(over.validate().is_err());
        assert!(FeatureVector::zeroed().validate().is_ok());
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            FeatureVector::from_json(json!([1, 2, 3])).unwrap_err(),
            FeatureError::NotAnObject
        );
    }

    #[test]
    fn test_field_table_matches_struct() {
        let v = FeatureVector::zeroed();
        let serialized = serde_json::to_value(&v).unwrap();
        let keys: Vec<&str> = serialized.as_object().unwrap().keys().map(|k| k.as_str()).collect();

        assert_eq!(keys.len(), FEATURE_COUNT);
        for name in feature_names() {
            assert!(keys.contains(&name), "{} missing from struct", name);
        }
    }
}
