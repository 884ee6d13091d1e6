//! Daily reporting
//!
//! A `Reporter` turns the stored history of one day into something a human
//! reads. `DigestReporter` renders a plain-text digest and sends it through
//! the regular notifier.

use crate::notify::{Notifier, NotifyError};
use crate::store::{DailyAggregate, Store, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, date: NaiveDate) -> Result<(), ReportError>;
}

pub struct DigestReporter {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    host_label: String,
}

impl DigestReporter {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, host_label: impl Into<String>) -> Self {
        Self {
            store,
            notifier,
            host_label: host_label.into(),
        }
    }
}

#[async_trait]
impl Reporter for DigestReporter {
    async fn report(&self, date: NaiveDate) -> Result<(), ReportError> {
        let aggregate = self.store.daily_aggregate(date).await?;
        let digest = render_digest(&aggregate, &self.host_label);
        self.notifier.send(&digest).await?;
        info!(date = %date, targets = aggregate.targets.len(), "daily report sent");
        Ok(())
    }
}

pub fn render_digest(aggregate: &DailyAggregate, host: &str) -> String {
    let mut out = format!("📊 [{}] Daily report for {}\n", host, aggregate.date);

    if aggregate.targets.is_empty() && aggregate.system.is_none() {
        out.push_str("No data recorded.");
        return out;
    }

    if !aggregate.targets.is_empty() {
        out.push_str("\nTargets:\n");
        for target in &aggregate.targets {
            let icon = if target.failures == 0 { "🟢" } else { "🔴" };
            out.push_str(&format!(
                "{} [{}] {}: {:.2}% up ({} checks, {} failed), avg {:.0} ms\n",
                icon,
                target.kind,
                target.name,
                target.uptime_pct,
                target.checks,
                target.failures,
                target.avg_latency_ms
            ));
        }
    }

    if let Some(system) = &aggregate.system {
        let disk = match system.max_disk_pct {
            Some(disk) => format!("Disk max {}%", disk),
            None => "Disk n/a".to_string(),
        };
        out.push_str(&format!(
            "\nSystem:\nCPU avg {:.1}% / max {:.1}%\nRAM avg {:.1}% / max {}%\n{}\n{} samples, {} warning, {} critical",
            system.avg_cpu_pct,
            system.max_cpu_pct,
            system.avg_ram_pct,
            system.max_ram_pct,
            disk,
            system.samples,
            system.warning_samples,
            system.critical_samples
        ));
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeKind;
    use crate::store::{MemoryStore, SystemDaily, TargetDaily};
    use parking_lot::Mutex;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[derive(Default)]
    struct Collecting {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Collecting {
        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn empty_day_says_so() {
        let aggregate = DailyAggregate {
            date: day(),
            targets: vec![],
            system: None,
        };
        let digest = render_digest(&aggregate, "nas");
        assert!(digest.contains("[nas] Daily report for 2026-03-14"));
        assert!(digest.ends_with("No data recorded."));
    }

    #[test]
    fn digest_lists_targets_and_system() {
        let aggregate = DailyAggregate {
            date: day(),
            targets: vec![TargetDaily {
                name: "db".into(),
                kind: ProbeKind::Tcp,
                address: "db.internal:5432".into(),
                checks: 4,
                failures: 1,
                uptime_pct: 75.0,
                avg_latency_ms: 12.5,
            }],
            system: Some(SystemDaily {
                samples: 10,
                avg_cpu_pct: 21.37,
                max_cpu_pct: 88.0,
                avg_ram_pct: 60.0,
                max_ram_pct: 91,
                max_disk_pct: None,
                warning_samples: 2,
                critical_samples: 0,
            }),
        };

        let digest = render_digest(&aggregate, "nas");
        assert!(digest.contains("🔴 [TCP] db: 75.00% up (4 checks, 1 failed)"));
        assert!(digest.contains("CPU avg 21.4% / max 88.0%"));
        assert!(digest.contains("RAM avg 60.0% / max 91%"));
        assert!(digest.contains("Disk n/a"));
        assert!(digest.ends_with("10 samples, 2 warning, 0 critical"));
    }

    #[tokio::test]
    async fn digest_reporter_sends_through_notifier() {
        let notifier = Arc::new(Collecting::default());
        let reporter = DigestReporter::new(Arc::new(MemoryStore::new()), notifier.clone(), "nas");

        reporter.report(day()).await.unwrap();

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("No data recorded."));
    }
}
