//! Alert delivery
//!
//! `Notifier` is the seam between the monitors and whatever actually reaches
//! a human. Delivery failures are logged and swallowed by `deliver`; they
//! never stop a monitoring cycle.

mod mqtt;

pub use mqtt::{AlertMessage, MqttNotifier, ALERT_TOPIC};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("MQTT publish failed: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0} not supported by this notifier")]
    Unsupported(&'static str),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send text to every configured recipient
    async fn send(&self, text: &str) -> Result<(), NotifyError>;

    /// Best-effort image delivery, only used by reporting
    async fn send_image(&self, _path: &Path, _caption: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported("send_image"))
    }
}

/// Send and log; returns whether delivery succeeded
pub async fn deliver(notifier: &dyn Notifier, text: &str) -> bool {
    match notifier.send(text).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "alert delivery failed");
            false
        }
    }
}

/// Writes alerts to the log only
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "symbion_sentinel::alert", "{}", text);
        Ok(())
    }
}

/// Fan-out to several notifiers.
///
/// Succeeds when at least one recipient accepted the message.
#[derive(Default, Clone)]
pub struct Broadcast {
    recipients: Vec<Arc<dyn Notifier>>,
}

impl Broadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.recipients.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

#[async_trait]
impl Notifier for Broadcast {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let mut failures = 0usize;
        for (index, recipient) in self.recipients.iter().enumerate() {
            if let Err(e) = recipient.send(text).await {
                warn!(recipient = index, error = %e, "recipient failed");
                failures += 1;
            }
        }

        if failures > 0 && failures == self.recipients.len() {
            return Err(NotifyError::Delivery(format!("all {} recipients failed", failures)));
        }
        Ok(())
    }

    async fn send_image(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        let mut delivered = false;
        for recipient in &self.recipients {
            match recipient.send_image(path, caption).await {
                Ok(()) => delivered = true,
                Err(NotifyError::Unsupported(_)) => {}
                Err(e) => warn!(error = %e, "image delivery failed"),
            }
        }

        if delivered {
            Ok(())
        } else {
            Err(NotifyError::Unsupported("send_image"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collecting {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Collecting {
        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        async fn send(&self, _text: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("offline".into()))
        }
    }

    #[tokio::test]
    async fn broadcast_survives_a_broken_recipient() {
        let collecting = Arc::new(Collecting::default());
        let broadcast = Broadcast::new().with(Arc::new(Broken)).with(collecting.clone());

        assert!(broadcast.send("disk full").await.is_ok());
        assert_eq!(*collecting.sent.lock(), vec!["disk full".to_string()]);
    }

    #[tokio::test]
    async fn broadcast_fails_when_everyone_fails() {
        let broadcast = Broadcast::new().with(Arc::new(Broken)).with(Arc::new(Broken));
        assert!(matches!(broadcast.send("x").await, Err(NotifyError::Delivery(_))));
    }

    #[tokio::test]
    async fn deliver_swallows_errors() {
        assert!(!deliver(&Broken, "x").await);
        assert!(deliver(&LogNotifier, "x").await);
    }

    #[tokio::test]
    async fn images_are_unsupported_by_default() {
        let result = LogNotifier.send_image(Path::new("/tmp/chart.png"), "daily").await;
        assert!(matches!(result, Err(NotifyError::Unsupported(_))));
    }
}
