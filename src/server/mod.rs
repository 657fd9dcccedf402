//! HTTP server for metrics exposition
//!
//! - `<telemetry path>` - Runs a scrape and serves Prometheus text format
//! - `/` - Landing page linking to the telemetry path
//! - `/healthz` - Liveness probe (process is running)

mod http;
pub mod metrics;

pub use http::{effective_deadline, router, run_server, AppState, SCRAPE_TIMEOUT_HEADER};
pub use metrics::{create_metrics, ExporterMetrics, SharedMetrics};

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_tests;
