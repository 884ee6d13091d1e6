//! Raw host readings: CPU tick counters, memory, root filesystem usage
//!
//! `SystemHost` reads the real machine:
//! - CPU ticks from `/proc/stat` (aggregate `cpu` line)
//! - memory through sysinfo
//! - disk through `df`, bounded by a timeout

use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::time::Duration;
use sysinfo::System;
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read host counters: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected counter format: {0}")]
    Parse(String),
}

/// Aggregate CPU tick counters across all cores.
///
/// The previous reading is the baseline needed to compute a usage delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTicks {
    pub idle_ticks: u64,
    pub total_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    pub total_mb: u64,
    pub free_mb: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskReading {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: u8,
}

/// Source of raw host readings
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn cpu_ticks(&self) -> Result<CpuTicks, SampleError>;

    async fn memory(&self) -> Result<MemoryReading, SampleError>;

    /// `None` when disk usage cannot be obtained; never an error
    async fn disk(&self) -> Option<DiskReading>;
}

/// The machine this process runs on
pub struct SystemHost {
    system: Mutex<System>,
    mount_point: String,
    disk_timeout: Duration,
}

impl SystemHost {
    pub fn new(disk_timeout: Duration) -> Self {
        Self {
            system: Mutex::new(System::new()),
            mount_point: "/".to_string(),
            disk_timeout,
        }
    }

    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    async fn query_df(&self) -> Result<String, String> {
        let output = tokio::time::timeout(
            self.disk_timeout,
            AsyncCommand::new("df")
                .arg(&self.mount_point)
                .arg("--output=size,used,avail,pcent")
                .arg("--block-size=1G")
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| "df timed out".to_string())?
        .map_err(|e| format!("failed to run df: {}", e))?;

        if !output.status.success() {
            return Err(format!(
                "df exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl HostProbe for SystemHost {
    async fn cpu_ticks(&self) -> Result<CpuTicks, SampleError> {
        let stat = tokio::fs::read_to_string("/proc/stat").await?;
        parse_proc_stat(&stat)
    }

    async fn memory(&self) -> Result<MemoryReading, SampleError> {
        let mut sys = self.system.lock();
        sys.refresh_memory();

        // sysinfo reports bytes
        let total_mb = sys.total_memory() / (1024 * 1024);
        let free_mb = sys.available_memory() / (1024 * 1024);
        if total_mb == 0 {
            return Err(SampleError::Parse("total memory reported as zero".into()));
        }

        Ok(MemoryReading { total_mb, free_mb })
    }

    async fn disk(&self) -> Option<DiskReading> {
        match self.query_df().await {
            Ok(text) => {
                let reading = parse_df_output(&text);
                if reading.is_none() {
                    warn!(mount = %self.mount_point, "unparsable df output, disk omitted");
                }
                reading
            }
            Err(e) => {
                warn!(mount = %self.mount_point, error = %e, "disk usage unavailable, disk omitted");
                None
            }
        }
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// idle = idle + iowait, total = user..steal (guest time is already
/// included in user).
pub fn parse_proc_stat(stat: &str) -> Result<CpuTicks, SampleError> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SampleError::Parse("no aggregate cpu line".into()))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|v| v.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| SampleError::Parse(format!("bad cpu field: {}", e)))?;

    if fields.len() < 4 {
        return Err(SampleError::Parse(format!("only {} cpu fields", fields.len())));
    }

    let idle_ticks = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total_ticks = fields.iter().sum();

    debug!(idle_ticks, total_ticks, "cpu ticks read");
    Ok(CpuTicks {
        idle_ticks,
        total_ticks,
    })
}

/// Parse `df --output=size,used,avail,pcent --block-size=1G` output
pub fn parse_df_output(text: &str) -> Option<DiskReading> {
    let data = text.lines().nth(1)?;
    let parts: Vec<&str> = data.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }

    let total_gb: f64 = parts[0].trim_end_matches('G').parse().ok()?;
    let used_gb: f64 = parts[1].trim_end_matches('G').parse().ok()?;
    let free_gb: f64 = parts[2].trim_end_matches('G').parse().ok()?;
    let percent: u8 = parts[3].trim_end_matches('%').parse().ok()?;

    Some(DiskReading {
        total_gb,
        used_gb,
        free_gb,
        percent,
    })
}
