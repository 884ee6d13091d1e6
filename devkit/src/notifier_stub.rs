/*!
Notifiers de test

`RecordingNotifier` enregistre tous les messages envoyés pour les assertions.
`FailingNotifier` refuse toute livraison.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use symbion_sentinel::notify::{Notifier, NotifyError};

/// Notifier qui garde une copie de chaque message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tous les textes envoyés, dans l'ordre
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Nombre de messages contenant `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|text| text.contains(needle))
            .count()
    }

    pub fn last(&self) -> Option<String> {
        self.sent.lock().last().cloned()
    }

    /// Reset les messages enregistrés
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().push(text.to_string());
        log::info!("📤 [MOCK] Notification: {}", text.lines().next().unwrap_or(""));
        Ok(())
    }
}

/// Notifier toujours hors service
#[derive(Debug, Clone, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _text: &str) -> Result<(), NotifyError> {
        log::warn!("❌ [MOCK] Notification refused");
        Err(NotifyError::Delivery("mock notifier offline".into()))
    }
}
