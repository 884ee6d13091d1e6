//! Transition detection: decides whether a new status deserves a message
//!
//! Two policies coexist:
//! - `LevelTriggered` (test targets): every unhealthy status alerts, recovery
//!   only on the failing -> healthy edge
//! - `EdgeTriggered` (host health): alerts only when the status changes to a
//!   different unhealthy value, repeated identical statuses stay quiet

use crate::models::{Outcome, Severity};

/// A status that can be healthy or not
pub trait HealthState: Copy + PartialEq {
    fn is_healthy(&self) -> bool;
}

impl HealthState for Outcome {
    fn is_healthy(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl HealthState for Severity {
    fn is_healthy(&self) -> bool {
        matches!(self, Severity::Healthy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    LevelTriggered,
    EdgeTriggered,
}

/// What to tell humans about a new status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Alert,
    Recovery,
    Quiet,
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionDetector {
    policy: AlertPolicy,
}

impl TransitionDetector {
    pub const fn level_triggered() -> Self {
        Self {
            policy: AlertPolicy::LevelTriggered,
        }
    }

    pub const fn edge_triggered() -> Self {
        Self {
            policy: AlertPolicy::EdgeTriggered,
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    /// `previous` is the last persisted status for the same entity, `None`
    /// when there is no history (or it could not be read).
    pub fn evaluate<S: HealthState>(&self, previous: Option<S>, current: S) -> Transition {
        if current.is_healthy() {
            return match previous {
                Some(prev) if !prev.is_healthy() => Transition::Recovery,
                _ => Transition::Quiet,
            };
        }

        match self.policy {
            AlertPolicy::LevelTriggered => Transition::Alert,
            AlertPolicy::EdgeTriggered if previous != Some(current) => Transition::Alert,
            AlertPolicy::EdgeTriggered => Transition::Quiet,
        }
    }
}
