//! Prometheus metrics for the service readiness exporter
//!
//! Exposes:
//! - `service_ready_up` - readiness of every discovered host (0 or 1)
//! - Scrape health of the exporter itself (errors, duration, hosts found)

use crate::collector::probe::ReadinessObservation;
use prometheus::{
    self, Encoder, GaugeVec, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{Arc, RwLock};

/// Metric namespace shared by every exported series
pub const METRIC_NAMESPACE: &str = "service_ready";

/// Labels carried by `service_ready_up`
pub const READY_LABELS: [&str; 3] = ["namespace", "name", "host"];

/// Exporter metrics registry
///
/// Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    /// Readiness per (namespace, name, host)
    pub up: GaugeVec,
    /// Scrapes aborted before publishing, by reason (discovery, timeout)
    pub scrape_errors_total: IntCounterVec,
    /// Duration of completed scrapes in seconds
    pub scrape_duration_seconds: Histogram,
    /// Hosts found by the last successful scrape
    pub hosts_discovered: IntGauge,
    // Writers: publish. Readers: encode. A gather never sees a half-filled batch.
    batch: Arc<RwLock<()>>,
}

impl ExporterMetrics {
    /// Create a new registry with all exporter metrics
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let up = GaugeVec::new(
            Opts::new("up", "Ready check is ok.").namespace(METRIC_NAMESPACE),
            &READY_LABELS,
        )?;
        registry.register(Box::new(up.clone()))?;

        let scrape_errors_total = IntCounterVec::new(
            Opts::new(
                "scrape_errors_total",
                "Total number of scrapes aborted before publishing",
            )
            .namespace(METRIC_NAMESPACE),
            &["reason"], // discovery, timeout
        )?;
        registry.register(Box::new(scrape_errors_total.clone()))?;

        let scrape_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scrape_duration_seconds",
                "Duration of completed scrapes in seconds",
            )
            .namespace(METRIC_NAMESPACE)
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        let hosts_discovered = IntGauge::with_opts(
            Opts::new(
                "hosts_discovered",
                "Number of routable hosts found by the last successful scrape",
            )
            .namespace(METRIC_NAMESPACE),
        )?;
        registry.register(Box::new(hosts_discovered.clone()))?;

        Ok(Self {
            registry,
            up,
            scrape_errors_total,
            scrape_duration_seconds,
            hosts_discovered,
            batch: Arc::new(RwLock::new(())),
        })
    }

    /// Replace every `service_ready_up` series with this scrape's batch
    ///
    /// Series for hosts that disappeared since the previous scrape are dropped.
    /// Concurrent [`encode`](Self::encode) calls see either the old or the new
    /// batch, never a mix.
    pub fn publish(&self, observations: &[ReadinessObservation]) {
        let _batch = self.batch.write().unwrap_or_else(|e| e.into_inner());
        self.up.reset();
        for observation in observations {
            let host = &observation.host;
            self.up
                .with_label_values(&[host.namespace.as_str(), host.name.as_str(), host.host.as_str()])
                .set(observation.value());
        }
        self.hosts_discovered.set(observations.len() as i64);
    }

    /// Record an aborted scrape
    pub fn record_scrape_error(&self, reason: &str) {
        self.scrape_errors_total.with_label_values(&[reason]).inc();
    }

    /// Record a completed scrape
    pub fn record_scrape_duration(&self, duration_secs: f64) {
        self.scrape_duration_seconds.observe(duration_secs);
    }

    /// Encode all metrics to Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = {
            let _batch = self.batch.read().unwrap_or_else(|e| e.into_inner());
            self.registry.gather()
        };
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
        })
    }
}

/// Shared metrics handle
pub type SharedMetrics = Arc<ExporterMetrics>;

/// Create a new shared metrics instance
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(ExporterMetrics::new()?))
}
