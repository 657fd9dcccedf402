//! Readiness collector
//!
//! One scrape = resolve cluster connection, discover hosts, probe each host,
//! publish the whole batch. Nothing is carried over between scrapes.

pub mod probe;

use crate::discovery::{discover_hosts, ClusterConnector, DiscoveryError, RoutableHost};
use crate::server::metrics::SharedMetrics;
use probe::{ProbeOutcome, Prober, ReadinessObservation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("scrape exceeded deadline of {0:?}")]
    Timeout(Duration),
}

/// Collects `service_ready_up` for every routable host in the cluster
pub struct ReadinessCollector {
    connector: Arc<dyn ClusterConnector>,
    prober: Prober,
    concurrency: usize,
    metrics: SharedMetrics,
    // Overlapping scrapes queue behind each other
    scrape_lock: Mutex<()>,
}

impl ReadinessCollector {
    pub fn new(
        connector: Arc<dyn ClusterConnector>,
        prober: Prober,
        concurrency: usize,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            connector,
            prober,
            concurrency: concurrency.max(1),
            metrics,
            scrape_lock: Mutex::new(()),
        }
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Run one scrape and publish its observations
    ///
    /// On discovery failure the previously published readiness series are
    /// left untouched and the error is returned.
    pub async fn scrape(&self) -> Result<Vec<ReadinessObservation>, ScrapeError> {
        let _guard = self.scrape_lock.lock().await;
        let start = Instant::now();

        let hosts = match self.discover().await {
            Ok(hosts) => hosts,
            Err(e) => {
                error!(error = %e, "Discovery failed, aborting scrape");
                self.metrics.record_scrape_error("discovery");
                return Err(e.into());
            }
        };

        let observations = self.prober.probe_all(hosts, self.concurrency).await;
        self.metrics.publish(&observations);

        let elapsed = start.elapsed();
        self.metrics.record_scrape_duration(elapsed.as_secs_f64());

        let ready = observations
            .iter()
            .filter(|o| o.outcome == ProbeOutcome::Ready)
            .count();
        info!(
            hosts = observations.len(),
            ready = ready,
            duration_ms = elapsed.as_millis() as u64,
            "Scrape complete"
        );

        Ok(observations)
    }

    /// Run one scrape, cancelling it (and every in-flight probe) at `deadline`
    pub async fn scrape_within(
        &self,
        deadline: Duration,
    ) -> Result<Vec<ReadinessObservation>, ScrapeError> {
        match tokio::time::timeout(deadline, self.scrape()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_ms = deadline.as_millis() as u64, "Scrape timed out");
                self.metrics.record_scrape_error("timeout");
                Err(ScrapeError::Timeout(deadline))
            }
        }
    }

    async fn discover(&self) -> Result<Vec<RoutableHost>, DiscoveryError> {
        let api = self.connector.connect().await?;
        discover_hosts(api.as_ref()).await
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
