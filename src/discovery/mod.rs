//! Cluster host discovery
//!
//! Walks every namespace, every Ingress in it and every rule of each Ingress,
//! producing one [`RoutableHost`] per rule that names a host.

pub mod cluster;

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use thiserror::Error;
use tracing::debug;

pub use cluster::{KubeClusterApi, KubeConnector};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid KUBECONFIG_CONTENT: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("no usable cluster credentials: in-cluster ({in_cluster}), kubeconfig ({kubeconfig})")]
    NoCredentials {
        in_cluster: kube::config::InClusterError,
        kubeconfig: kube::config::KubeconfigError,
    },

    #[error("failed to build Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    #[error("failed to list namespaces: {0}")]
    ListNamespaces(#[source] kube::Error),

    #[error("failed to list ingresses in namespace {namespace}: {source}")]
    ListIngresses {
        namespace: String,
        #[source]
        source: kube::Error,
    },
}

/// An externally routable host taken from one Ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutableHost {
    /// Namespace of the owning Ingress
    pub namespace: String,
    /// Name of the owning Ingress
    pub name: String,
    /// Host the rule routes for
    pub host: String,
}

impl RoutableHost {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            host: host.into(),
        }
    }
}

/// Read-only view of the control plane used by discovery
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Names of every namespace in the cluster
    async fn list_namespaces(&self) -> Result<Vec<String>, DiscoveryError>;

    /// Every Ingress in `namespace` (single page, no filtering)
    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, DiscoveryError>;
}

/// Produces a fresh [`ClusterApi`] handle for each scrape
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ClusterApi>, DiscoveryError>;
}

/// Expand one Ingress into its routable hosts
///
/// Rules without a host (the catch-all default-backend form) have nothing to
/// probe and are skipped.
pub fn hosts_from_ingress(namespace: &str, ingress: &Ingress) -> Vec<RoutableHost> {
    let name = ingress.name_any();
    let rules = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_deref())
        .unwrap_or_default();

    rules
        .iter()
        .filter_map(|rule| match rule.host.as_deref() {
            Some(host) if !host.is_empty() => Some(RoutableHost::new(namespace, &name, host)),
            _ => {
                debug!(
                    namespace = %namespace,
                    ingress = %name,
                    "Skipping ingress rule without host"
                );
                None
            }
        })
        .collect()
}

/// Discover every routable host visible in the cluster right now
///
/// Any list failure aborts discovery; a partial host list is never returned.
pub async fn discover_hosts(api: &dyn ClusterApi) -> Result<Vec<RoutableHost>, DiscoveryError> {
    let mut hosts = Vec::new();

    for namespace in api.list_namespaces().await? {
        for ingress in api.list_ingresses(&namespace).await? {
            hosts.extend(hosts_from_ingress(&namespace, &ingress));
        }
    }

    debug!(hosts = hosts.len(), "Discovery complete");
    Ok(hosts)
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
