//! Host resource sampling for Symbion Sentinel
//!
//! Produces one classified `SystemSample` per call:
//! - CPU usage from the delta between two tick readings
//! - Memory usage (used = total - free)
//! - Root filesystem usage, omitted when unavailable
//!
//! The CPU baseline belongs to the `Sampler` instance. A fresh (or reset)
//! sampler yields nothing on its first call.

mod host;

pub use host::{
    parse_df_output, parse_proc_stat, CpuTicks, DiskReading, HostProbe, MemoryReading,
    SampleError, SystemHost,
};

use crate::classify::{classify, Thresholds};
use crate::models::SystemSample;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Stateful sampler owning the CPU baseline
pub struct Sampler {
    host: Arc<dyn HostProbe>,
    thresholds: Thresholds,
    baseline: Option<CpuTicks>,
}

impl Sampler {
    pub fn new(host: Arc<dyn HostProbe>, thresholds: Thresholds) -> Self {
        Self {
            host,
            thresholds,
            baseline: None,
        }
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Forget the CPU baseline; the next call only re-seeds it
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    /// Take one reading.
    ///
    /// Returns `Ok(None)` when no baseline existed yet (the reading becomes
    /// the baseline).
    pub async fn sample(&mut self) -> Result<Option<SystemSample>, SampleError> {
        let ticks = self.host.cpu_ticks().await?;
        let Some(previous) = self.baseline.replace(ticks) else {
            debug!("CPU baseline seeded, no sample produced");
            return Ok(None);
        };
        let cpu_pct = cpu_percent(previous, ticks);

        let memory = self.host.memory().await?;
        let ram_used_mb = memory.total_mb.saturating_sub(memory.free_mb);
        let ram_pct = percent_of(ram_used_mb, memory.total_mb);

        let disk = self.host.disk().await;

        let classification = classify(
            cpu_pct,
            f64::from(ram_pct),
            disk.map(|d| f64::from(d.percent)),
            &self.thresholds,
        );

        Ok(Some(SystemSample {
            cpu_pct,
            ram_used_mb,
            ram_total_mb: memory.total_mb,
            ram_free_mb: memory.free_mb,
            ram_pct,
            disk_used_gb: disk.map(|d| d.used_gb),
            disk_total_gb: disk.map(|d| d.total_gb),
            disk_free_gb: disk.map(|d| d.free_gb),
            disk_pct: disk.map(|d| d.percent),
            severity: classification.severity,
            message: classification.message,
            observed_at: Utc::now(),
        }))
    }
}

/// `100 - 100 * idle_delta / total_delta`, clamped to [0, 100], one decimal
pub fn cpu_percent(previous: CpuTicks, current: CpuTicks) -> f64 {
    let idle_delta = current.idle_ticks.saturating_sub(previous.idle_ticks) as f64;
    let total_delta = current.total_ticks.saturating_sub(previous.total_ticks) as f64;
    if total_delta <= 0.0 {
        return 0.0;
    }

    let usage = (100.0 - 100.0 * (idle_delta / total_delta)).clamp(0.0, 100.0);
    (usage * 10.0).round() / 10.0
}

fn percent_of(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
