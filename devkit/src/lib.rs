/*!
# Symbion DevKit - Stubs et Utilitaires de Test pour Sentinel

Bibliothèque facilitant les tests de Symbion Sentinel sans réseau ni vraie machine:
- Notifier enregistreur (et notifier en panne)
- Probe et hôte scriptés
- Horloge liée au temps tokio et reporter enregistreur
- Store qui échoue sur commande
- Harness assemblant store, notifier et moniteurs
*/

pub mod clock_stub;
pub mod host_stub;
pub mod notifier_stub;
pub mod probe_stub;
pub mod reporter_stub;
pub mod store_stub;
pub mod test_utils;

pub use clock_stub::PausedClock;
pub use host_stub::ScriptedHost;
pub use notifier_stub::{FailingNotifier, RecordingNotifier};
pub use probe_stub::ScriptedProbe;
pub use reporter_stub::RecordingReporter;
pub use store_stub::FlakyStore;
pub use test_utils::TestHarness;
