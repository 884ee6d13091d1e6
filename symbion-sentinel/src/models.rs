//! Data model shared by probes, sampler, stores and notifiers
//!
//! Everything here is plain data: results and samples are immutable once
//! built and are appended to history as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeKind {
    Http,
    Tcp,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Http => write!(f, "HTTP"),
            ProbeKind::Tcp => write!(f, "TCP"),
        }
    }
}

/// A configured network target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTarget {
    /// Display label only, may collide across targets
    pub name: String,
    pub kind: ProbeKind,
    pub address: String,
    pub timeout: Duration,
}

impl TestTarget {
    pub fn http(name: impl Into<String>, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            kind: ProbeKind::Http,
            address: address.into(),
            timeout,
        }
    }

    pub fn tcp(name: impl Into<String>, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            kind: ProbeKind::Tcp,
            address: address.into(),
            timeout,
        }
    }

    /// Identity used for status tracking
    pub fn key(&self) -> TargetKey {
        TargetKey {
            kind: self.kind,
            address: self.address.clone(),
        }
    }
}

/// Status-tracking identity of a target: `(kind, address)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetKey {
    pub kind: ProbeKind,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
}

/// Outcome of one probe, as appended to history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub kind: ProbeKind,
    pub name: String,
    pub address: String,
    pub outcome: Outcome,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub is_recovery: bool,
    pub observed_at: DateTime<Utc>,
}

impl TestResult {
    pub fn key(&self) -> TargetKey {
        TargetKey {
            kind: self.kind,
            address: self.address.clone(),
        }
    }
}

/// Ordered host health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Healthy => write!(f, "HEALTHY"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// One classified reading of host resources.
///
/// Disk fields are all `None` when the disk query failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    pub cpu_pct: f64,
    pub ram_used_mb: u64,
    pub ram_total_mb: u64,
    pub ram_free_mb: u64,
    pub ram_pct: u8,
    pub disk_used_gb: Option<f64>,
    pub disk_total_gb: Option<f64>,
    pub disk_free_gb: Option<f64>,
    pub disk_pct: Option<u8>,
    pub severity: Severity,
    pub message: Option<String>,
    pub observed_at: DateTime<Utc>,
}
