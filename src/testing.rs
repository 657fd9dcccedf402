//! Shared fixtures for unit tests: an in-memory cluster and loopback
//! readiness endpoints.

use crate::discovery::{ClusterApi, ClusterConnector, DiscoveryError};
use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Router};
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::net::TcpListener;

/// Build an Ingress from `(name, hosts)`; `None` hosts become host-less rules
pub fn ingress(name: &str, hosts: &[Option<&str>]) -> Ingress {
    let rules: Vec<serde_json::Value> = hosts
        .iter()
        .map(|host| match host {
            Some(h) => serde_json::json!({ "host": h }),
            None => serde_json::json!({}),
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": { "name": name },
        "spec": { "rules": rules }
    }))
    .expect("valid ingress fixture")
}

/// In-memory cluster: namespace -> ingresses
#[derive(Clone, Default)]
pub struct StaticCluster {
    namespaces: BTreeMap<String, Vec<Ingress>>,
    fail_namespaces: bool,
    fail_ingresses_in: Option<String>,
}

impl StaticCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: &str, ingresses: Vec<Ingress>) -> Self {
        self.namespaces.insert(namespace.to_string(), ingresses);
        self
    }

    pub fn failing_namespaces(mut self) -> Self {
        self.fail_namespaces = true;
        self
    }

    pub fn failing_ingresses_in(mut self, namespace: &str) -> Self {
        self.fail_ingresses_in = Some(namespace.to_string());
        self
    }
}

fn api_error(message: &str) -> kube::Error {
    kube::Error::Service(message.to_string().into())
}

#[async_trait]
impl ClusterApi for StaticCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>, DiscoveryError> {
        if self.fail_namespaces {
            return Err(DiscoveryError::ListNamespaces(api_error(
                "namespaces is forbidden",
            )));
        }
        Ok(self.namespaces.keys().cloned().collect())
    }

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, DiscoveryError> {
        if self.fail_ingresses_in.as_deref() == Some(namespace) {
            return Err(DiscoveryError::ListIngresses {
                namespace: namespace.to_string(),
                source: api_error("ingresses is forbidden"),
            });
        }
        Ok(self.namespaces.get(namespace).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ClusterConnector for StaticCluster {
    async fn connect(&self) -> Result<Box<dyn ClusterApi>, DiscoveryError> {
        Ok(Box::new(self.clone()))
    }
}

/// Serve `GET /readyz` with a fixed status on a loopback port.
/// Returns the `host:port` to probe.
pub async fn spawn_readyz(status: StatusCode) -> String {
    spawn_readyz_with_delay(status, Duration::ZERO).await
}

/// Like [`spawn_readyz`] but the handler sleeps before answering
pub async fn spawn_readyz_with_delay(status: StatusCode, delay: Duration) -> String {
    let app = Router::new().route(
        "/readyz",
        get(move || async move {
            tokio::time::sleep(delay).await;
            status
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr.to_string()
}

/// A loopback `host:port` with nothing listening on it
pub async fn closed_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr.to_string()
}

/// Find the exposed value of `service_ready_up` for `host`
pub fn up_value(output: &str, host: &str) -> Option<String> {
    let needle = format!("host=\"{}\"", host);
    output
        .lines()
        .filter(|line| line.starts_with("service_ready_up{"))
        .find(|line| line.contains(&needle))
        .and_then(|line| line.rsplit(' ').next())
        .map(str::to_string)
}
