//! Symbion Sentinel - liveness and host-health monitoring agent
//!
//! Periodically probes HTTP/TCP targets and samples host resources,
//! records every observation, and alerts on state transitions:
//! - targets: every failure alerts, the first success after a failure recovers
//! - system: alerts only when the severity changes
//!
//! A daily digest of the recorded history is sent at a configured hour.

pub mod classify;
pub mod config;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod probe;
pub mod report;
pub mod sampler;
pub mod scheduler;
pub mod store;
pub mod transition;

pub use config::SentinelConfig;
pub use models::{Outcome, ProbeKind, Severity, SystemSample, TestResult, TestTarget};
pub use monitor::{SystemMonitor, TargetMonitor};
pub use scheduler::{ScheduleHandle, ScheduleSettings, Scheduler};
