//! Monitoring cycles: measure, classify, decide, notify, then persist
//!
//! The new record is appended only after any message has been dispatched,
//! so the "last status" read of a cycle always reflects the previous cycle.
//! Store and notifier failures are logged, never propagated.

use crate::models::{Outcome, SystemSample, TestResult, TestTarget};
use crate::notify::{deliver, Notifier};
use crate::probe::{Probe, ProbeReport};
use crate::sampler::Sampler;
use crate::store::Store;
use crate::transition::{Transition, TransitionDetector};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Probes targets; failures alert every time, recoveries once
pub struct TargetMonitor {
    probe: Arc<dyn Probe>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    detector: TransitionDetector,
}

impl TargetMonitor {
    pub fn new(probe: Arc<dyn Probe>, store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            probe,
            store,
            notifier,
            detector: TransitionDetector::level_triggered(),
        }
    }

    /// Probe one target and record exactly one result
    pub async fn check(&self, target: &TestTarget) -> TestResult {
        let previous = match self.store.last_status(target.kind, &target.address).await {
            Ok(previous) => previous,
            Err(e) => {
                warn!(address = %target.address, error = %e, "last status unavailable, assuming none");
                None
            }
        };

        let report = self.probe.probe(target).await;
        let transition = self.detector.evaluate(previous, report.outcome);
        let result = build_result(target, report, transition == Transition::Recovery);

        match transition {
            Transition::Alert => {
                warn!(kind = %result.kind, address = %result.address, error = ?result.error, "target down");
                deliver(self.notifier.as_ref(), &failure_text(&result)).await;
            }
            Transition::Recovery => {
                info!(kind = %result.kind, address = %result.address, "target recovered");
                deliver(self.notifier.as_ref(), &recovery_text(&result)).await;
            }
            Transition::Quiet => {
                debug!(kind = %result.kind, address = %result.address, latency_ms = result.latency_ms, "target up");
            }
        }

        if let Err(e) = self.store.append_result(&result).await {
            error!(address = %result.address, error = %e, "failed to store test result");
        }

        result
    }

    /// Probe every target concurrently
    pub async fn run_cycle(&self, targets: &[TestTarget]) -> Vec<TestResult> {
        let results = join_all(targets.iter().map(|t| self.check(t))).await;
        let failed = results.iter().filter(|r| r.outcome == Outcome::Failed).count();
        info!(targets = results.len(), failed, "test cycle complete");
        results
    }
}

fn build_result(target: &TestTarget, report: ProbeReport, is_recovery: bool) -> TestResult {
    TestResult {
        kind: target.kind,
        name: target.name.clone(),
        address: target.address.clone(),
        outcome: report.outcome,
        latency_ms: report.latency_ms,
        error: report.error,
        is_recovery,
        observed_at: Utc::now(),
    }
}

/// Samples host resources; alerts only on severity changes
pub struct SystemMonitor {
    sampler: Mutex<Sampler>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    detector: TransitionDetector,
    host_label: String,
}

impl SystemMonitor {
    pub fn new(
        sampler: Sampler,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        host_label: impl Into<String>,
    ) -> Self {
        Self {
            sampler: Mutex::new(sampler),
            store,
            notifier,
            detector: TransitionDetector::edge_triggered(),
            host_label: host_label.into(),
        }
    }

    /// Seed the CPU baseline; any sample produced is discarded
    pub async fn bootstrap(&self) {
        let mut sampler = self.sampler.lock().await;
        sampler.reset();
        match sampler.sample().await {
            Ok(_) => debug!("CPU baseline bootstrapped"),
            Err(e) => error!(error = %e, "CPU baseline bootstrap failed"),
        }
    }

    /// One sampling cycle.
    ///
    /// Cycles are serialized: the sampler lock is held until the sample is
    /// persisted. Returns `None` when no sample was produced.
    pub async fn run_cycle(&self) -> Option<SystemSample> {
        let mut sampler = self.sampler.lock().await;

        let sample = match sampler.sample().await {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                info!("CPU baseline seeded, waiting for next cycle");
                return None;
            }
            Err(e) => {
                error!(error = %e, "system sampling failed");
                return None;
            }
        };

        let previous = match self.store.last_system_severity().await {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "last system severity unavailable, assuming none");
                None
            }
        };

        match self.detector.evaluate(previous, sample.severity) {
            Transition::Alert => {
                warn!(severity = %sample.severity, message = ?sample.message, "system health degraded");
                deliver(self.notifier.as_ref(), &system_alert_text(&self.host_label, &sample)).await;
            }
            Transition::Recovery => {
                info!("system health recovered");
                deliver(self.notifier.as_ref(), &system_recovery_text(&self.host_label, &sample)).await;
            }
            Transition::Quiet => {
                debug!(severity = %sample.severity, cpu = sample.cpu_pct, ram = sample.ram_pct, "system sample");
            }
        }

        if let Err(e) = self.store.append_sample(&sample).await {
            error!(error = %e, "failed to store system sample");
        }

        drop(sampler);
        Some(sample)
    }
}

pub fn failure_text(result: &TestResult) -> String {
    format!(
        "🔴 [{}] {} is DOWN\n{}\nError: {} ({} ms)",
        result.kind,
        result.name,
        result.address,
        result.error.as_deref().unwrap_or("unknown error"),
        result.latency_ms
    )
}

pub fn recovery_text(result: &TestResult) -> String {
    format!(
        "🟢 [{}] {} is back UP\n{}\nLatency: {} ms",
        result.kind, result.name, result.address, result.latency_ms
    )
}

fn usage_line(sample: &SystemSample) -> String {
    let mut line = format!("CPU {:.0}% · RAM {}%", sample.cpu_pct, sample.ram_pct);
    if let Some(disk) = sample.disk_pct {
        line.push_str(&format!(" · Disk {}%", disk));
    }
    line
}

pub fn system_alert_text(host: &str, sample: &SystemSample) -> String {
    let icon = match sample.severity {
        crate::models::Severity::Critical => "🚨",
        _ => "⚠️",
    };
    format!(
        "{} [{}] System {}\n{}\n{}",
        icon,
        host,
        sample.severity,
        sample.message.as_deref().unwrap_or(""),
        usage_line(sample)
    )
}

pub fn system_recovery_text(host: &str, sample: &SystemSample) -> String {
    format!("✅ [{}] System back to HEALTHY\n{}", host, usage_line(sample))
}
