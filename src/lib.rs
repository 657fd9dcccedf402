pub mod collector;
pub mod config;
pub mod discovery;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

// Re-export for main.rs and integration tests
pub use crate::collector::{ReadinessCollector, ScrapeError};
pub use crate::config::{Config, ConfigError};
pub use crate::discovery::{ClusterApi, ClusterConnector, DiscoveryError, RoutableHost};
