//! Symbion Sentinel - monitoring agent binary
//!
//! Wires configuration, history store, notifiers and monitors together,
//! then runs the schedules until Ctrl-C.

use anyhow::{Context, Result};
use std::sync::Arc;
use symbion_sentinel::config::SentinelConfig;
use symbion_sentinel::notify::{Broadcast, LogNotifier, MqttNotifier, Notifier};
use symbion_sentinel::probe::Prober;
use symbion_sentinel::report::DigestReporter;
use symbion_sentinel::sampler::{Sampler, SystemHost};
use symbion_sentinel::store::{JsonlStore, MemoryStore, Store};
use symbion_sentinel::{ScheduleHandle, ScheduleSettings, Scheduler, SystemMonitor, TargetMonitor};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Running agent
struct Sentinel {
    config: SentinelConfig,
    host_label: String,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl Sentinel {
    async fn new() -> Result<Self> {
        info!("Initializing Symbion Sentinel v{}", env!("CARGO_PKG_VERSION"));

        let config = SentinelConfig::load()
            .await
            .context("Failed to load configuration")?;

        let host_label = gethostname::gethostname().to_string_lossy().into_owned();

        let store: Arc<dyn Store> = match &config.store.path {
            Some(path) => Arc::new(
                JsonlStore::open(path)
                    .await
                    .with_context(|| format!("Failed to open history store {}", path.display()))?,
            ),
            None => {
                info!("No store path configured, history kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let mut broadcast = Broadcast::new().with(Arc::new(LogNotifier));
        if let Some(mqtt) = &config.mqtt {
            broadcast = broadcast.with(Arc::new(MqttNotifier::connect(mqtt, host_label.clone())));
        }
        info!(recipients = broadcast.len(), "notifiers ready");

        Ok(Self {
            config,
            host_label,
            store,
            notifier: Arc::new(broadcast),
        })
    }

    fn start(&self) -> ScheduleHandle {
        let targets = self.config.targets();
        for target in &targets {
            info!(kind = %target.kind, name = %target.name, address = %target.address, "monitoring target");
        }

        let target_monitor = Arc::new(TargetMonitor::new(
            Arc::new(Prober::new()),
            self.store.clone(),
            self.notifier.clone(),
        ));

        let sampler = Sampler::new(
            Arc::new(SystemHost::new(self.config.disk_timeout())),
            self.config.thresholds.clone(),
        );
        let system_monitor = Arc::new(SystemMonitor::new(
            sampler,
            self.store.clone(),
            self.notifier.clone(),
            self.host_label.clone(),
        ));

        let reporter = Arc::new(DigestReporter::new(
            self.store.clone(),
            self.notifier.clone(),
            self.host_label.clone(),
        ));

        Scheduler::new(
            ScheduleSettings::from_config(&self.config),
            targets,
            target_monitor,
            system_monitor,
            reporter,
        )
        .start()
    }

    async fn run(&self) -> Result<()> {
        let handle = self.start();

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;

        info!("Shutdown requested");
        handle.shutdown();
        handle.join().await;
        info!("Symbion Sentinel stopped");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("symbion_sentinel=info")),
        )
        .init();

    info!("🛰️ Symbion Sentinel starting...");

    let sentinel = Sentinel::new()
        .await
        .context("Failed to create sentinel")?;

    sentinel.run().await.context("Sentinel execution failed")?;

    Ok(())
}
