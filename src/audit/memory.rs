//! In-process audit store for development and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{AuditError, AuditStore};
use crate::models::{AuditRecord, FeatureVector, PredictionResult};

#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(
        &self,
        features: &FeatureVector,
        result: &PredictionResult,
        created_at: DateTime<Utc>,
    ) -> Result<i64, AuditError> {
        let mut records = self.records.lock();
        // Id assignment and push happen under one lock, so ids stay ascending
        let id = records.last().map_or(1, |r| r.id + 1);
        records.push(AuditRecord {
            id,
            features: features.clone(),
            result: *result,
            created_at,
        });
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::models::RiskCategory;

    fn result() -> PredictionResult {
        PredictionResult { default_probability: 0.12, risk_category: RiskCategory::Low }
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let store = MemoryAuditStore::new();
        let v = FeatureVector::zeroed();

        let first = store.append(&v, &result(), Utc::now()).await.unwrap();
        let second = store.append(&v, &result(), Utc::now()).await.unwrap();

        assert!(second > first);
        assert_eq!(store.count(), 2);
        assert_eq!(store.records()[1].id, second);
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_unique_ids() {
        let store = Arc::new(MemoryAuditStore::new());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.append(&FeatureVector::zeroed(), &result(), Utc::now()).await.unwrap()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(store.count(), 32);

        let stored: Vec<i64> = store.records().iter().map(|r| r.id).collect();
        assert!(stored.windows(2).all(|w| w[0] < w[1]));
    }
}
