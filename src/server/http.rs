//! Exposition endpoints
//!
//! Every request to the telemetry path triggers a fresh scrape. A failed
//! scrape answers with an error status instead of stale samples.

use crate::collector::{ReadinessCollector, ScrapeError};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Header Prometheus sends with its per-scrape timeout in seconds
pub const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

/// Shared state for the exposition handlers
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<ReadinessCollector>,
    pub telemetry_path: String,
    pub scrape_timeout: Duration,
}

/// Pick the tighter of the configured scrape timeout and the scraper's own
pub fn effective_deadline(configured: Duration, headers: &HeaderMap) -> Duration {
    headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(|timeout| configured.min(timeout))
        .unwrap_or(configured)
}

/// Telemetry handler
///
/// 200 with the registry on success, 500 on discovery failure,
/// 503 when the scrape deadline expires.
async fn metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let deadline = effective_deadline(state.scrape_timeout, &headers);

    if let Err(e) = state.collector.scrape_within(deadline).await {
        let status = match &e {
            ScrapeError::Discovery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScrapeError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        return (status, format!("scrape failed: {}\n", e)).into_response();
    }

    match state.collector.metrics().encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {}\n", e),
            )
                .into_response()
        }
    }
}

/// Landing page
async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>
<head><title>Service Ready Exporter</title></head>
<body>
<h1>Service Ready Exporter</h1>
<p><a href='{}'>Metrics</a></p>
</body>
</html>
",
        state.telemetry_path
    ))
}

/// Liveness probe handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Build the exposition router
pub fn router(state: AppState) -> Router {
    let telemetry_path = state.telemetry_path.clone();
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(&telemetry_path, get(metrics))
        .with_state(state)
}

/// Run the exposition server on `addr`
///
/// Runs until the server is shut down.
pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<(), std::io::Error> {
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    // Log after successful bind - server is actually listening
    info!(address = %addr, "Listening on address");

    axum::serve(listener, app)
        .await
        .map_err(std::io::Error::other)
}
