//! Main controller implementation.
//!
//! The `Controller` wires the Kubernetes client, the store-backed
//! [`Reconciler`] and the cluster watcher together and runs the watcher in
//! a background task.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::{WatchContext, watch_clusters};
use cluster_store::KubeClusterStore;
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for CassandraCluster resources.
pub struct Controller {
    cluster_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing CassandraCluster Controller");

        let client = Client::try_default().await?;
        let store = KubeClusterStore::new(client.clone());
        let reconciler = Reconciler::new(store, config.request_timeout);
        let ctx = Arc::new(WatchContext::new(reconciler, config.resync_interval));

        let namespace = config.namespace;
        let cluster_watcher =
            tokio::spawn(async move { watch_clusters(client, namespace, ctx).await });

        Ok(Self { cluster_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("CassandraCluster Controller running");

        self.cluster_watcher
            .await
            .map_err(|e| {
                ControllerError::Watch(format!("CassandraCluster watcher panicked: {}", e))
            })?
            .map_err(|e| ControllerError::Watch(format!("CassandraCluster watcher error: {}", e)))?;

        info!("CassandraCluster Controller stopped");
        Ok(())
    }
}
