use crate::models::{Outcome, ProbeKind, Severity, SystemSample, TargetKey, TestResult};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Per-target statistics for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetDaily {
    pub name: String,
    pub kind: ProbeKind,
    pub address: String,
    pub checks: u32,
    pub failures: u32,
    pub uptime_pct: f64,
    pub avg_latency_ms: f64,
}

/// Host statistics for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemDaily {
    pub samples: u32,
    pub avg_cpu_pct: f64,
    pub max_cpu_pct: f64,
    pub avg_ram_pct: f64,
    pub max_ram_pct: u8,
    pub max_disk_pct: Option<u8>,
    pub warning_samples: u32,
    pub critical_samples: u32,
}

/// Everything recorded on one (local) calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    /// In order of first appearance that day
    pub targets: Vec<TargetDaily>,
    pub system: Option<SystemDaily>,
}

pub(crate) fn local_date(at: &DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

impl DailyAggregate {
    pub fn from_history(date: NaiveDate, results: &[TestResult], samples: &[SystemSample]) -> Self {
        let mut targets: Vec<TargetDaily> = Vec::new();
        let mut latency_sums: Vec<u64> = Vec::new();
        let mut index: HashMap<TargetKey, usize> = HashMap::new();

        for result in results.iter().filter(|r| local_date(&r.observed_at) == date) {
            let slot = *index.entry(result.key()).or_insert_with(|| {
                targets.push(TargetDaily {
                    name: result.name.clone(),
                    kind: result.kind,
                    address: result.address.clone(),
                    checks: 0,
                    failures: 0,
                    uptime_pct: 0.0,
                    avg_latency_ms: 0.0,
                });
                latency_sums.push(0);
                targets.len() - 1
            });

            let entry = &mut targets[slot];
            entry.checks += 1;
            if result.outcome == Outcome::Failed {
                entry.failures += 1;
            }
            latency_sums[slot] += result.latency_ms;
        }

        for (entry, latency_sum) in targets.iter_mut().zip(latency_sums) {
            let checks = f64::from(entry.checks);
            entry.uptime_pct = round2(f64::from(entry.checks - entry.failures) / checks * 100.0);
            entry.avg_latency_ms = round2(latency_sum as f64 / checks);
        }

        let day_samples: Vec<&SystemSample> = samples
            .iter()
            .filter(|s| local_date(&s.observed_at) == date)
            .collect();

        Self {
            date,
            targets,
            system: SystemDaily::from_samples(&day_samples),
        }
    }
}

impl SystemDaily {
    fn from_samples(samples: &[&SystemSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len() as f64;
        let cpu_sum: f64 = samples.iter().map(|s| s.cpu_pct).sum();
        let ram_sum: f64 = samples.iter().map(|s| f64::from(s.ram_pct)).sum();

        Some(Self {
            samples: samples.len() as u32,
            avg_cpu_pct: round2(cpu_sum / count),
            max_cpu_pct: samples.iter().map(|s| s.cpu_pct).fold(0.0, f64::max),
            avg_ram_pct: round2(ram_sum / count),
            max_ram_pct: samples.iter().map(|s| s.ram_pct).max().unwrap_or(0),
            max_disk_pct: samples.iter().filter_map(|s| s.disk_pct).max(),
            warning_samples: samples.iter().filter(|s| s.severity == Severity::Warning).count() as u32,
            critical_samples: samples.iter().filter(|s| s.severity == Severity::Critical).count() as u32,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
