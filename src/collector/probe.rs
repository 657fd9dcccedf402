//! Readiness probing
//!
//! Each host is checked with `GET http://{host}/readyz`. Any response with a
//! status of 299 or lower counts as ready; everything else, including
//! connection errors and timeouts, counts as not ready.

use crate::discovery::RoutableHost;
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Path probed on every discovered host
pub const READYZ_PATH: &str = "/readyz";

/// Result of one readiness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    NotReady,
}

impl ProbeOutcome {
    /// Gauge value: 1 for ready, 0 otherwise
    pub fn value(self) -> f64 {
        match self {
            ProbeOutcome::Ready => 1.0,
            ProbeOutcome::NotReady => 0.0,
        }
    }
}

/// Classify an HTTP status
pub fn classify_status(status: StatusCode) -> ProbeOutcome {
    if status.as_u16() <= 299 {
        ProbeOutcome::Ready
    } else {
        ProbeOutcome::NotReady
    }
}

/// One host paired with its probe outcome
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessObservation {
    pub host: RoutableHost,
    pub outcome: ProbeOutcome,
}

impl ReadinessObservation {
    pub fn value(&self) -> f64 {
        self.outcome.value()
    }
}

/// HTTP prober with a bounded per-request timeout
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Probe a single host. Never fails: errors map to [`ProbeOutcome::NotReady`].
    pub async fn probe(&self, host: &str) -> ProbeOutcome {
        let url = format!("http://{}{}", host, READYZ_PATH);

        match self.client.get(&url).send().await {
            // Response (and its connection) is dropped once classified
            Ok(response) => {
                let outcome = classify_status(response.status());
                debug!(
                    host = %host,
                    status = response.status().as_u16(),
                    ready = outcome == ProbeOutcome::Ready,
                    "Readiness probe answered"
                );
                outcome
            }
            Err(e) => {
                debug!(host = %host, error = %e, "Readiness probe failed");
                ProbeOutcome::NotReady
            }
        }
    }

    /// Probe every host with at most `concurrency` requests in flight
    ///
    /// Returns exactly one observation per input host, in input order.
    pub async fn probe_all(
        &self,
        hosts: Vec<RoutableHost>,
        concurrency: usize,
    ) -> Vec<ReadinessObservation> {
        stream::iter(hosts)
            .map(|host| async move {
                let outcome = self.probe(&host.host).await;
                ReadinessObservation { host, outcome }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
#[path = "probe_test.rs"]
mod tests;
