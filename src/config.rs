//! Command-line configuration
//!
//! Every flag can also be set through the environment variable shown in
//! `--help`.

use clap::{Parser, ValueEnum};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid listen address {0:?}")]
    InvalidListenAddress(String),

    #[error("invalid duration {0:?} (expected e.g. 500ms, 5s, 1m)")]
    InvalidDuration(String),

    #[error("telemetry path must start with '/' and must not be '/' or '/healthz': {0:?}")]
    InvalidTelemetryPath(String),

    #[error("probe concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("--{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable key=value lines
    Logfmt,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "service-ready-exporter")]
#[command(version)]
#[command(about = "Exports readiness of every Ingress host in a Kubernetes cluster", long_about = None)]
pub struct Config {
    /// Address to listen on for web interface and telemetry
    #[arg(
        long = "web.listen-address",
        default_value = ":9150",
        env = "SERVICE_READY_LISTEN_ADDRESS"
    )]
    pub listen_address: String,

    /// Path under which to expose metrics
    #[arg(
        long = "web.telemetry-path",
        default_value = "/metrics",
        env = "SERVICE_READY_TELEMETRY_PATH"
    )]
    pub telemetry_path: String,

    /// Timeout for a single readiness probe
    #[arg(
        long = "probe.timeout",
        default_value = "5s",
        value_parser = parse_duration,
        env = "SERVICE_READY_PROBE_TIMEOUT"
    )]
    pub probe_timeout: Duration,

    /// Maximum number of readiness probes in flight (1 = sequential)
    #[arg(
        long = "probe.concurrency",
        default_value_t = 16,
        env = "SERVICE_READY_PROBE_CONCURRENCY"
    )]
    pub probe_concurrency: usize,

    /// Upper bound on one whole scrape
    #[arg(
        long = "scrape.timeout",
        default_value = "30s",
        value_parser = parse_duration,
        env = "SERVICE_READY_SCRAPE_TIMEOUT"
    )]
    pub scrape_timeout: Duration,

    /// Kubeconfig used when neither KUBECONFIG_CONTENT nor in-cluster credentials are available
    #[arg(long = "kubeconfig", env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(
        long = "log.level",
        default_value = "info",
        env = "SERVICE_READY_LOG_LEVEL"
    )]
    pub log_level: String,

    /// Output format of log messages
    #[arg(
        long = "log.format",
        value_enum,
        default_value_t = LogFormat::Logfmt,
        env = "SERVICE_READY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

impl Config {
    /// Check values clap cannot validate on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = &self.telemetry_path;
        if !path.starts_with('/') || path == "/" || path == "/healthz" {
            return Err(ConfigError::InvalidTelemetryPath(path.clone()));
        }
        if self.probe_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("probe.timeout"));
        }
        if self.scrape_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("scrape.timeout"));
        }
        self.listen_socket_addr()?;
        Ok(())
    }

    /// Resolve the listen address; `:9150` binds every interface
    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_address(&self.listen_address)
    }
}

/// Parse `host:port` or `:port`
pub fn parse_listen_address(value: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = || ConfigError::InvalidListenAddress(value.to_string());

    if let Some(port) = value.strip_prefix(':') {
        let port: u16 = port.parse().map_err(|_| invalid())?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    value.parse().map_err(|_| invalid())
}

/// Parse `500ms`, `5s`, `1m` or a bare number of seconds
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(value.to_string());
    let value = value.trim();

    let (number, unit) = match value.find(|c: char| c.is_ascii_alphabetic()) {
        Some(idx) => value.split_at(idx),
        None => (value, "s"),
    };
    let number: f64 = number.parse().map_err(|_| invalid())?;
    if number < 0.0 {
        return Err(invalid());
    }

    let secs = match unit {
        "ms" => number / 1000.0,
        "s" => number,
        "m" => number * 60.0,
        _ => return Err(invalid()),
    };

    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
