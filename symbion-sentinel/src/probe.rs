//! Probe execution for HTTP and TCP targets
//!
//! A probe never fails as a Rust error: every network problem is folded
//! into a `Failed` report with a short human-readable reason. All probes
//! are bounded by the target's timeout.

use crate::models::{Outcome, ProbeKind, TestTarget};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

/// Network-level result of one probe, before history and alerting
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub outcome: Outcome,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn success(elapsed: Duration) -> Self {
        Self {
            outcome: Outcome::Success,
            latency_ms: millis(elapsed),
            error: None,
        }
    }

    pub fn failed(elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            latency_ms: millis(elapsed),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
    #[error("Invalid address '{0}': expected host:port")]
    MissingPort(String),
    #[error("Invalid address '{0}': bad port")]
    BadPort(String),
    #[error("Invalid address '{0}': empty host")]
    EmptyHost(String),
}

/// Split `host:port`, accepting bracketed IPv6 (`[::1]:80`)
pub fn parse_host_port(address: &str) -> Result<(String, u16), AddressError> {
    let trimmed = address.trim();
    let (host, port) = trimmed
        .rsplit_once(':')
        .ok_or_else(|| AddressError::MissingPort(address.to_string()))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(AddressError::EmptyHost(address.to_string()));
    }

    let port: u16 = port
        .parse()
        .map_err(|_| AddressError::BadPort(address.to_string()))?;

    Ok((host.to_string(), port))
}

/// Something that can check a target
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &TestTarget) -> ProbeReport;
}

/// Network prober; holds the shared HTTP client
#[derive(Clone)]
pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(concat!("symbion-sentinel/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// GET the url; status < 400 is a success
    pub async fn probe_http(&self, url: &str, timeout: Duration) -> ProbeReport {
        let start = Instant::now();
        let response = self.client.get(url).timeout(timeout).send().await;
        let elapsed = start.elapsed();

        match response {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() < 400 {
                    ProbeReport::success(elapsed)
                } else {
                    ProbeReport::failed(elapsed, format!("HTTP {}", status.as_u16()))
                }
            }
            Err(e) => ProbeReport::failed(elapsed, describe_http_error(&e)),
        }
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for Prober {
    async fn probe(&self, target: &TestTarget) -> ProbeReport {
        debug!(kind = %target.kind, address = %target.address, "probing target");
        match target.kind {
            ProbeKind::Http => self.probe_http(&target.address, target.timeout).await,
            ProbeKind::Tcp => probe_tcp(&target.address, target.timeout).await,
        }
    }
}

/// Open a raw connection and close it as soon as it completes
pub async fn probe_tcp(address: &str, timeout: Duration) -> ProbeReport {
    let (host, port) = match parse_host_port(address) {
        Ok(parts) => parts,
        Err(e) => return ProbeReport::failed(Duration::ZERO, e.to_string()),
    };

    let start = Instant::now();
    let attempt = tokio::time::timeout(timeout, TcpStream::connect((host.as_str(), port))).await;
    let elapsed = start.elapsed();

    match attempt {
        Ok(Ok(stream)) => {
            drop(stream);
            ProbeReport::success(elapsed)
        }
        Ok(Err(e)) => ProbeReport::failed(elapsed, e.to_string()),
        Err(_) => ProbeReport::failed(elapsed, "Connection timeout"),
    }
}

fn describe_http_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Timeout".to_string()
    } else if err.is_connect() {
        "Unreachable".to_string()
    } else {
        err.to_string()
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
