/*!
Store en panne sur commande

Enveloppe un `MemoryStore`; lectures et écritures peuvent être coupées
indépendamment pour simuler un stockage indisponible.
*/

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use symbion_sentinel::models::{Outcome, ProbeKind, Severity, SystemSample, TestResult};
use symbion_sentinel::store::{DailyAggregate, MemoryStore, Store, StoreError};

#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    rejected_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Écritures refusées depuis la création
    pub fn rejected_writes(&self) -> usize {
        self.rejected_writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            self.rejected_writes.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("mock store refuses writes".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("mock store refuses reads".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn append_result(&self, result: &TestResult) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.append_result(result).await
    }

    async fn append_sample(&self, sample: &SystemSample) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.append_sample(sample).await
    }

    async fn last_status(&self, kind: ProbeKind, address: &str) -> Result<Option<Outcome>, StoreError> {
        self.check_read()?;
        self.inner.last_status(kind, address).await
    }

    async fn last_system_severity(&self) -> Result<Option<Severity>, StoreError> {
        self.check_read()?;
        self.inner.last_system_severity().await
    }

    async fn daily_aggregate(&self, date: NaiveDate) -> Result<DailyAggregate, StoreError> {
        self.check_read()?;
        self.inner.daily_aggregate(date).await
    }
}
