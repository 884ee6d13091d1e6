//! Append-only history of probe results and system samples
//!
//! The monitors only need three things from a store: append, "last known
//! status" lookups, and a daily aggregate for reporting. Two backends:
//! - `MemoryStore`: in-process, lost on restart
//! - `JsonlStore`: JSON lines file, replayed on open
//!
//! Both keep only the last `RETENTION_DAYS` calendar days in memory.

mod aggregate;
mod jsonl;
mod memory;

pub use aggregate::{DailyAggregate, SystemDaily, TargetDaily};

use aggregate::local_date;
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use crate::models::{Outcome, ProbeKind, Severity, SystemSample, TargetKey, TestResult};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn append_result(&self, result: &TestResult) -> Result<(), StoreError>;

    async fn append_sample(&self, sample: &SystemSample) -> Result<(), StoreError>;

    /// Outcome of the most recent result for `(kind, address)`
    async fn last_status(&self, kind: ProbeKind, address: &str) -> Result<Option<Outcome>, StoreError>;

    async fn last_system_severity(&self) -> Result<Option<Severity>, StoreError>;

    async fn daily_aggregate(&self, date: NaiveDate) -> Result<DailyAggregate, StoreError>;
}

/// Calendar days of records kept in memory: today and yesterday, which is
/// what the daily report reads
pub const RETENTION_DAYS: u64 = 2;

/// In-memory history shared by both backends.
///
/// Records older than the retention window are dropped as newer ones
/// arrive; the last known status of every target is kept regardless.
#[derive(Debug)]
pub(crate) struct History {
    results: Vec<TestResult>,
    samples: Vec<SystemSample>,
    last_outcomes: HashMap<TargetKey, Outcome>,
    retention_days: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::with_retention(RETENTION_DAYS)
    }
}

impl History {
    pub(crate) fn with_retention(days: u64) -> Self {
        Self {
            results: Vec::new(),
            samples: Vec::new(),
            last_outcomes: HashMap::new(),
            retention_days: days.max(1),
        }
    }

    /// Oldest local date still kept once a record dated `newest` is stored
    fn cutoff(&self, newest: NaiveDate) -> NaiveDate {
        newest
            .checked_sub_days(Days::new(self.retention_days - 1))
            .unwrap_or(NaiveDate::MIN)
    }

    pub(crate) fn push_result(&mut self, result: TestResult) {
        let cutoff = self.cutoff(local_date(&result.observed_at));
        if self.results.first().is_some_and(|r| local_date(&r.observed_at) < cutoff) {
            self.results.retain(|r| local_date(&r.observed_at) >= cutoff);
        }
        self.last_outcomes.insert(result.key(), result.outcome);
        self.results.push(result);
    }

    pub(crate) fn push_sample(&mut self, sample: SystemSample) {
        let cutoff = self.cutoff(local_date(&sample.observed_at));
        if self.samples.first().is_some_and(|s| local_date(&s.observed_at) < cutoff) {
            self.samples.retain(|s| local_date(&s.observed_at) >= cutoff);
        }
        self.samples.push(sample);
    }

    pub(crate) fn last_status(&self, kind: ProbeKind, address: &str) -> Option<Outcome> {
        let key = TargetKey {
            kind,
            address: address.to_string(),
        };
        self.last_outcomes.get(&key).copied()
    }

    pub(crate) fn last_system_severity(&self) -> Option<Severity> {
        self.samples.last().map(|s| s.severity)
    }

    pub(crate) fn daily_aggregate(&self, date: NaiveDate) -> DailyAggregate {
        DailyAggregate::from_history(date, &self.results, &self.samples)
    }

    pub(crate) fn len(&self) -> (usize, usize) {
        (self.results.len(), self.samples.len())
    }
}
