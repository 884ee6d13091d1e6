use super::{DailyAggregate, History, Store, StoreError};
use crate::models::{Outcome, ProbeKind, Severity, SystemSample, TestResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

/// Process-local history
#[derive(Debug, Default)]
pub struct MemoryStore {
    history: RwLock<History>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored `(results, samples)`
    pub async fn len(&self) -> (usize, usize) {
        self.history.read().await.len()
    }

    pub async fn results(&self) -> Vec<TestResult> {
        self.history.read().await.results.clone()
    }

    pub async fn samples(&self) -> Vec<SystemSample> {
        self.history.read().await.samples.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append_result(&self, result: &TestResult) -> Result<(), StoreError> {
        self.history.write().await.push_result(result.clone());
        Ok(())
    }

    async fn append_sample(&self, sample: &SystemSample) -> Result<(), StoreError> {
        self.history.write().await.push_sample(sample.clone());
        Ok(())
    }

    async fn last_status(&self, kind: ProbeKind, address: &str) -> Result<Option<Outcome>, StoreError> {
        Ok(self.history.read().await.last_status(kind, address))
    }

    async fn last_system_severity(&self) -> Result<Option<Severity>, StoreError> {
        Ok(self.history.read().await.last_system_severity())
    }

    async fn daily_aggregate(&self, date: NaiveDate) -> Result<DailyAggregate, StoreError> {
        Ok(self.history.read().await.daily_aggregate(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(kind: ProbeKind, address: &str, outcome: Outcome) -> TestResult {
        TestResult {
            kind,
            name: "target".into(),
            address: address.into(),
            outcome,
            latency_ms: 5,
            error: None,
            is_recovery: false,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn last_status_is_keyed_by_kind_and_address() {
        let store = MemoryStore::new();
        store.append_result(&result(ProbeKind::Tcp, "db:5432", Outcome::Failed)).await.unwrap();
        store.append_result(&result(ProbeKind::Http, "db:5432", Outcome::Success)).await.unwrap();

        assert_eq!(store.last_status(ProbeKind::Tcp, "db:5432").await.unwrap(), Some(Outcome::Failed));
        assert_eq!(store.last_status(ProbeKind::Http, "db:5432").await.unwrap(), Some(Outcome::Success));
        assert_eq!(store.last_status(ProbeKind::Tcp, "other:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_status_follows_latest_append() {
        let store = MemoryStore::new();
        store.append_result(&result(ProbeKind::Tcp, "db:5432", Outcome::Failed)).await.unwrap();
        store.append_result(&result(ProbeKind::Tcp, "db:5432", Outcome::Success)).await.unwrap();

        assert_eq!(store.last_status(ProbeKind::Tcp, "db:5432").await.unwrap(), Some(Outcome::Success));
        assert_eq!(store.len().await, (2, 0));
    }

    #[tokio::test]
    async fn empty_store_has_no_system_severity() {
        let store = MemoryStore::new();
        assert_eq!(store.last_system_severity().await.unwrap(), None);
    }
}
