//! CassandraCluster Controller
//!
//! Converges CassandraCluster resources into the Kubernetes objects that run
//! them:
//! - headless Services for peer discovery (all pods and seeds)
//! - one StatefulSet per datacenter rack, with its data volume claims
//!
//! Every child is owned by its cluster and garbage collected with it.

mod backoff;
mod config;
mod controller;
mod error;
mod reconcile_helpers;
#[cfg(test)]
mod reconcile_helpers_test;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // kube's rustls transport needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting CassandraCluster Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Request timeout: {:?}", config.request_timeout);
    info!("  Resync interval: {:?}", config.resync_interval);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
