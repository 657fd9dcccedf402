//! Kubernetes connection resolution and list calls
//!
//! Credentials are resolved in this order:
//! 1. `KUBECONFIG_CONTENT` - raw kubeconfig YAML in the environment
//! 2. In-cluster service account
//! 3. Local kubeconfig file (`--kubeconfig`, else the default location)

use super::{ClusterApi, ClusterConnector, DiscoveryError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, ResourceExt};
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable holding a complete kubeconfig document
pub const KUBECONFIG_CONTENT_ENV: &str = "KUBECONFIG_CONTENT";

/// Resolves a Kubernetes client on every scrape
#[derive(Debug, Clone, Default)]
pub struct KubeConnector {
    kubeconfig_path: Option<PathBuf>,
}

impl KubeConnector {
    /// Create a connector that falls back to `kubeconfig_path` (or the kube
    /// default location when `None`)
    pub fn new(kubeconfig_path: Option<PathBuf>) -> Self {
        Self { kubeconfig_path }
    }

    /// Build a client config following the credential priority order
    pub async fn resolve_config(&self) -> Result<kube::Config, DiscoveryError> {
        let content = std::env::var(KUBECONFIG_CONTENT_ENV).unwrap_or_default();
        if !content.is_empty() {
            debug!("Using kubeconfig from {}", KUBECONFIG_CONTENT_ENV);
            let kubeconfig = Kubeconfig::from_yaml(&content)?;
            let config =
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await?;
            return Ok(config);
        }

        let in_cluster = match kube::Config::incluster() {
            Ok(config) => {
                debug!("Using in-cluster credentials");
                return Ok(config);
            }
            Err(e) => e,
        };

        match self.local_config().await {
            Ok(config) => {
                debug!(path = ?self.kubeconfig_path, "Using local kubeconfig");
                Ok(config)
            }
            Err(kubeconfig) => Err(DiscoveryError::NoCredentials {
                in_cluster,
                kubeconfig,
            }),
        }
    }

    async fn local_config(&self) -> Result<kube::Config, kube::config::KubeconfigError> {
        let options = KubeConfigOptions::default();
        match &self.kubeconfig_path {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &options).await
            }
            None => kube::Config::from_kubeconfig(&options).await,
        }
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn connect(&self) -> Result<Box<dyn ClusterApi>, DiscoveryError> {
        let config = self.resolve_config().await?;
        info!(cluster_url = %config.cluster_url, "Resolved Kubernetes connection");
        let client = Client::try_from(config).map_err(DiscoveryError::Client)?;
        Ok(Box::new(KubeClusterApi::new(client)))
    }
}

/// [`ClusterApi`] backed by a live Kubernetes client
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_namespaces(&self) -> Result<Vec<String>, DiscoveryError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .map_err(DiscoveryError::ListNamespaces)?;

        Ok(list.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, DiscoveryError> {
        let ingresses: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
        let list = ingresses
            .list(&ListParams::default())
            .await
            .map_err(|source| DiscoveryError::ListIngresses {
                namespace: namespace.to_string(),
                source,
            })?;

        Ok(list.items)
    }
}
