/*!
Probe scripté

Remplace les probes réseau: chaque adresse est "up" par défaut, peut être
marquée "down", ou recevoir une file de résultats ponctuels.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use symbion_sentinel::models::TestTarget;
use symbion_sentinel::probe::{Probe, ProbeReport};

#[derive(Default)]
struct ProbeScript {
    down: HashSet<String>,
    queued: HashMap<String, VecDeque<ProbeReport>>,
    calls: HashMap<String, usize>,
}

#[derive(Default)]
pub struct ScriptedProbe {
    script: Mutex<ProbeScript>,
    delay: Option<Duration>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chaque probe dure `delay` (temps tokio, compatible horloge en pause)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Marque une adresse comme durablement en panne (ou rétablie)
    pub fn set_down(&self, address: &str, down: bool) {
        let mut script = self.script.lock();
        if down {
            script.down.insert(address.to_string());
        } else {
            script.down.remove(address);
        }
    }

    /// Ajoute un résultat ponctuel, consommé avant l'état durable
    pub fn push(&self, address: &str, report: ProbeReport) {
        self.script
            .lock()
            .queued
            .entry(address.to_string())
            .or_default()
            .push_back(report);
    }

    /// Nombre de probes effectués sur une adresse
    pub fn calls(&self, address: &str) -> usize {
        self.script.lock().calls.get(address).copied().unwrap_or(0)
    }

    fn next_report(&self, address: &str) -> ProbeReport {
        let mut script = self.script.lock();
        *script.calls.entry(address.to_string()).or_insert(0) += 1;

        if let Some(report) = script.queued.get_mut(address).and_then(|q| q.pop_front()) {
            return report;
        }

        if script.down.contains(address) {
            ProbeReport::failed(Duration::from_millis(5), "Unreachable")
        } else {
            ProbeReport::success(Duration::from_millis(1))
        }
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, target: &TestTarget) -> ProbeReport {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let report = self.next_report(&target.address);
        log::debug!("🔎 [MOCK] Probe {} -> {:?}", target.address, report.outcome);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbion_sentinel::models::Outcome;

    fn target(address: &str) -> TestTarget {
        TestTarget::tcp(address, address, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn queued_reports_come_first() {
        let probe = ScriptedProbe::new();
        probe.set_down("db:5432", true);
        probe.push("db:5432", ProbeReport::success(Duration::from_millis(2)));

        assert_eq!(probe.probe(&target("db:5432")).await.outcome, Outcome::Success);
        assert_eq!(probe.probe(&target("db:5432")).await.outcome, Outcome::Failed);
        assert_eq!(probe.calls("db:5432"), 2);
    }

    #[tokio::test]
    async fn addresses_are_up_by_default() {
        let probe = ScriptedProbe::new();
        assert_eq!(probe.probe(&target("web:80")).await.outcome, Outcome::Success);
        assert_eq!(probe.calls("other:1"), 0);
    }
}
