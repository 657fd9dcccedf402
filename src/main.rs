use anyhow::Context as _;
use clap::Parser;
use service_ready_exporter::collector::probe::Prober;
use service_ready_exporter::discovery::KubeConnector;
use service_ready_exporter::server::{create_metrics, run_server, AppState};
use service_ready_exporter::config::LogFormat;
use service_ready_exporter::{Config, ReadinessCollector};
use std::sync::Arc;
use tracing::{error, info};

/// Build the log filter: `RUST_LOG` wins, then `--log.level`
pub fn log_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    let filter = log_filter(&config.log_level);
    match config.log_format {
        LogFormat::Logfmt => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting service_ready_exporter"
    );

    config.validate()?;
    let addr = config.listen_socket_addr()?;

    let metrics = create_metrics().context("failed to register metrics")?;
    let prober = Prober::new(config.probe_timeout).context("failed to build HTTP client")?;
    info!(
        probe_timeout_ms = config.probe_timeout.as_millis() as u64,
        probe_concurrency = config.probe_concurrency,
        scrape_timeout_ms = config.scrape_timeout.as_millis() as u64,
        "Readiness prober configured"
    );

    let connector = Arc::new(KubeConnector::new(config.kubeconfig.clone()));
    let collector = Arc::new(ReadinessCollector::new(
        connector,
        prober,
        config.probe_concurrency,
        metrics,
    ));

    let state = AppState {
        collector,
        telemetry_path: config.telemetry_path.clone(),
        scrape_timeout: config.scrape_timeout,
    };

    if let Err(e) = run_server(addr, state).await {
        error!(error = %e, "Error running HTTP server");
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
