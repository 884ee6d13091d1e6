//! Configuration management
//!
//! Handles:
//! - Target lists (HTTP / TCP), with a built-in fallback set
//! - Per-resource thresholds
//! - Schedule intervals, report hour, overlap policy
//! - History store location and optional MQTT broker

use crate::classify::Thresholds;
use crate::models::TestTarget;
use crate::scheduler::OverlapPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const CONFIG_ENV: &str = "SYMBION_SENTINEL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub schedule: ScheduleConfig,
    pub thresholds: Thresholds,
    pub probe: ProbeConfig,
    pub http_targets: Vec<TargetConf>,
    pub tcp_targets: Vec<TargetConf>,
    pub store: StoreConfig,
    pub mqtt: Option<MqttConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub test_interval_minutes: u64,
    pub system_interval_minutes: u64,
    /// Local hour (0-23) of the daily report
    pub report_hour: u32,
    /// Pause between CPU baseline and first real sample
    pub cpu_grace_secs: u64,
    pub overlap: OverlapPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub http_timeout_secs: u64,
    pub tcp_timeout_secs: u64,
    pub disk_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConf {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON lines history file; in-memory history when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: Option<String>,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u16,
    pub topic: Option<String>,
}

fn default_keep_alive() -> u16 {
    30
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            test_interval_minutes: 5,
            system_interval_minutes: 1,
            report_hour: 9,
            cpu_grace_secs: 5,
            overlap: OverlapPolicy::SingleFlight,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            tcp_timeout_secs: 5,
            disk_timeout_secs: 10,
        }
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            thresholds: Thresholds::default(),
            probe: ProbeConfig::default(),
            http_targets: Vec::new(),
            tcp_targets: Vec::new(),
            store: StoreConfig::default(),
            mqtt: None,
        }
    }
}

/// Used when no target is configured at all
pub fn default_http_targets() -> Vec<TargetConf> {
    vec![
        TargetConf {
            name: "Google".into(),
            address: "https://www.google.com".into(),
        },
        TargetConf {
            name: "Cloudflare".into(),
            address: "https://1.1.1.1".into(),
        },
    ]
}

/// Used when no target is configured at all
pub fn default_tcp_targets() -> Vec<TargetConf> {
    vec![
        TargetConf {
            name: "Cloudflare DNS".into(),
            address: "1.1.1.1:53".into(),
        },
        TargetConf {
            name: "Google DNS".into(),
            address: "8.8.8.8:53".into(),
        },
    ]
}

impl SentinelConfig {
    /// Load config from `$SYMBION_SENTINEL_CONFIG` or the OS config dir.
    ///
    /// A missing file yields the defaults.
    pub async fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let path = Self::config_file_path()?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SentinelConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("symbion-sentinel");
        path.push("config.toml");
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, pair) in [
            ("cpu", &self.thresholds.cpu),
            ("ram", &self.thresholds.ram),
            ("disk", &self.thresholds.disk),
        ] {
            if !pair.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "{} thresholds must be within 0-100 with warning <= critical (got {} / {})",
                    label, pair.warning, pair.critical
                )));
            }
        }

        if self.schedule.test_interval_minutes == 0 || self.schedule.system_interval_minutes == 0 {
            return Err(ConfigError::Invalid("intervals must be at least one minute".into()));
        }

        if self.schedule.report_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "report_hour must be 0-23 (got {})",
                self.schedule.report_hour
            )));
        }

        if self.probe.http_timeout_secs == 0
            || self.probe.tcp_timeout_secs == 0
            || self.probe.disk_timeout_secs == 0
        {
            return Err(ConfigError::Invalid("probe timeouts must be non-zero".into()));
        }

        Ok(())
    }

    /// Configured targets, or the built-in set when none are configured
    pub fn targets(&self) -> Vec<TestTarget> {
        let (http, tcp) = if self.http_targets.is_empty() && self.tcp_targets.is_empty() {
            (default_http_targets(), default_tcp_targets())
        } else {
            (self.http_targets.clone(), self.tcp_targets.clone())
        };

        let http_timeout = Duration::from_secs(self.probe.http_timeout_secs);
        let tcp_timeout = Duration::from_secs(self.probe.tcp_timeout_secs);

        http.into_iter()
            .map(|t| TestTarget::http(t.name, t.address, http_timeout))
            .chain(tcp.into_iter().map(|t| TestTarget::tcp(t.name, t.address, tcp_timeout)))
            .collect()
    }

    pub fn test_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.test_interval_minutes * 60)
    }

    pub fn system_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.system_interval_minutes * 60)
    }

    pub fn cpu_grace(&self) -> Duration {
        Duration::from_secs(self.schedule.cpu_grace_secs)
    }

    pub fn disk_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.disk_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeKind;

    #[test]
    fn test_default_config() {
        let config = SentinelConfig::default();
        assert_eq!(config.schedule.test_interval_minutes, 5);
        assert_eq!(config.schedule.overlap, OverlapPolicy::SingleFlight);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_target_lists_fall_back_to_builtins() {
        let targets = SentinelConfig::default().targets();
        assert_eq!(targets.len(), 4);
        assert!(targets.iter().any(|t| t.kind == ProbeKind::Http));
        assert!(targets.iter().any(|t| t.kind == ProbeKind::Tcp));
    }

    #[test]
    fn parses_toml() {
        let config = SentinelConfig::from_toml(
            r#"
            [schedule]
            test_interval_minutes = 2
            report_hour = 7
            overlap = "concurrent"

            [thresholds.ram]
            warning = 85.0
            critical = 95.0

            [[tcp_targets]]
            name = "db"
            address = "db.internal:5432"

            [mqtt]
            broker_host = "10.0.0.2"
            broker_port = 1883
            "#,
        )
        .unwrap();

        assert_eq!(config.test_interval(), Duration::from_secs(120));
        assert_eq!(config.schedule.system_interval_minutes, 1);
        assert_eq!(config.schedule.overlap, OverlapPolicy::Concurrent);
        assert_eq!(config.thresholds.cpu.warning, 80.0);

        let targets = config.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].kind, ProbeKind::Tcp);
        assert_eq!(targets[0].timeout, Duration::from_secs(5));

        assert_eq!(config.mqtt.unwrap().keep_alive_secs, 30);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let err = SentinelConfig::from_toml(
            r#"
            [thresholds.disk]
            warning = 97.0
            critical = 90.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("disk"));
    }

    #[test]
    fn rejects_bad_report_hour() {
        let err = SentinelConfig::from_toml("[schedule]\nreport_hour = 24\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_disk_timeout() {
        let err = SentinelConfig::from_toml("[probe]\ndisk_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("timeouts"));
    }

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SentinelConfig::load_from(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.schedule.report_hour, 9);
    }
}
