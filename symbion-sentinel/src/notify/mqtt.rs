//! MQTT alert publisher
//!
//! Publishes alerts as JSON on `symbion/sentinel/alert@v1` so any Symbion
//! subscriber (dashboard, chat bridge) can relay them.

use super::{Notifier, NotifyError};
use crate::config::MqttConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

pub const ALERT_TOPIC: &str = "symbion/sentinel/alert@v1";

/// Alert payload (matches sentinel.alert@v1 contract)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub host: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MqttNotifier {
    client: AsyncClient,
    topic: String,
    host: String,
}

impl MqttNotifier {
    /// Create the client and drive its event loop in the background
    pub fn connect(config: &MqttConfig, host: impl Into<String>) -> Self {
        let host = host.into();
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("symbion-sentinel-{}", host));

        let mut mqtt_options = MqttOptions::new(&client_id, &config.broker_host, config.broker_port);
        mqtt_options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
        mqtt_options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, 10);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("MQTT connected for alert delivery");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT connection error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        info!(broker = %config.broker_host, port = config.broker_port, client_id = %client_id, "MQTT notifier configured");

        Self::from_client(client, config.topic.clone().unwrap_or_else(|| ALERT_TOPIC.to_string()), host)
    }

    pub fn from_client(client: AsyncClient, topic: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            client,
            topic: topic.into(),
            host: host.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Notifier for MqttNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let message = AlertMessage {
            host: self.host.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        let payload = serde_json::to_vec(&message)?;

        // never wait on the request queue: it stops draining while the broker is away
        self.client
            .try_publish(&self.topic, QoS::AtLeastOnce, false, payload)?;

        debug!(topic = %self.topic, "alert published");
        Ok(())
    }
}
