//! Severity classification of host resource readings
//!
//! Each resource is bucketed independently against its own pair of
//! thresholds; the host severity is the worst bucket.

use crate::models::Severity;
use serde::{Deserialize, Serialize};

/// Warning and critical percentages for one resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdPair {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    pub fn classify(&self, percent: f64) -> Severity {
        if percent >= self.critical {
            Severity::Critical
        } else if percent >= self.warning {
            Severity::Warning
        } else {
            Severity::Healthy
        }
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=100.0).contains(&self.warning)
            && (0.0..=100.0).contains(&self.critical)
            && self.warning <= self.critical
    }
}

/// Per-resource thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu: ThresholdPair,
    pub ram: ThresholdPair,
    pub disk: ThresholdPair,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: ThresholdPair::new(80.0, 95.0),
            ram: ThresholdPair::new(85.0, 95.0),
            disk: ThresholdPair::new(85.0, 95.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub severity: Severity,
    /// Resources at or above their warning threshold, `None` when all healthy
    pub message: Option<String>,
}

/// Classify one reading. Disk is skipped entirely when absent.
pub fn classify(
    cpu_pct: f64,
    ram_pct: f64,
    disk_pct: Option<f64>,
    thresholds: &Thresholds,
) -> Classification {
    let mut readings = vec![("CPU", cpu_pct, &thresholds.cpu), ("RAM", ram_pct, &thresholds.ram)];
    if let Some(disk) = disk_pct {
        readings.push(("Disk", disk, &thresholds.disk));
    }

    let mut severity = Severity::Healthy;
    let mut flagged = Vec::new();

    for (label, percent, pair) in readings {
        let level = pair.classify(percent);
        if level > Severity::Healthy {
            flagged.push(format!("{} {:.0}% [{}]", label, percent, level));
        }
        severity = severity.max(level);
    }

    let message = if flagged.is_empty() {
        None
    } else {
        Some(flagged.join(", "))
    };

    Classification { severity, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> Thresholds {
        Thresholds {
            cpu: ThresholdPair::new(80.0, 95.0),
            ram: ThresholdPair::new(85.0, 95.0),
            disk: ThresholdPair::new(85.0, 95.0),
        }
    }

    #[test]
    fn ram_warning_band() {
        let c = classify(10.0, 90.0, Some(40.0), &thresholds());
        assert_eq!(c.severity, Severity::Warning);
        assert_eq!(c.message.as_deref(), Some("RAM 90% [WARNING]"));
    }

    #[test]
    fn worst_resource_wins() {
        let c = classify(10.0, 96.0, Some(40.0), &thresholds());
        assert_eq!(c.severity, Severity::Critical);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let pair = ThresholdPair::new(85.0, 95.0);
        assert_eq!(pair.classify(84.9), Severity::Healthy);
        assert_eq!(pair.classify(85.0), Severity::Warning);
        assert_eq!(pair.classify(95.0), Severity::Critical);
    }

    #[test]
    fn message_lists_resources_in_fixed_order() {
        let c = classify(97.0, 88.0, Some(90.0), &thresholds());
        assert_eq!(c.severity, Severity::Critical);
        assert_eq!(
            c.message.as_deref(),
            Some("CPU 97% [CRITICAL], RAM 88% [WARNING], Disk 90% [WARNING]")
        );
    }

    #[test]
    fn absent_disk_is_ignored() {
        let c = classify(10.0, 20.0, None, &thresholds());
        assert_eq!(c.severity, Severity::Healthy);
        assert!(c.message.is_none());
    }

    #[test]
    fn invalid_pairs_are_detected() {
        assert!(ThresholdPair::new(80.0, 95.0).is_valid());
        assert!(!ThresholdPair::new(96.0, 95.0).is_valid());
        assert!(!ThresholdPair::new(80.0, 120.0).is_valid());
    }
}
