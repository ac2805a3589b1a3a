//! Kubernetes resource watcher.
//!
//! Drives the [`Reconciler`] from a `kube_runtime::Controller` over
//! CassandraCluster objects. Changes to the Services and StatefulSets the
//! controller owns (filtered by the managed-by label) map back to their
//! cluster through the owner reference, so deleting or editing a child
//! triggers a reconcile of its parent.

use crate::backoff::BackoffTracker;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use cluster_store::ObjectKey;
use crds::{CassandraCluster, MANAGED_BY_LABEL, MANAGED_BY_LABEL_VALUE};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile invocation
pub struct WatchContext {
    reconciler: Reconciler,
    backoff: BackoffTracker,
    resync_interval: Duration,
}

impl WatchContext {
    /// Context for `reconciler`, requeueing converged clusters every `resync_interval`
    pub fn new(reconciler: Reconciler, resync_interval: Duration) -> Self {
        Self {
            reconciler,
            backoff: BackoffTracker::default(),
            resync_interval,
        }
    }
}

fn cluster_key(cluster: &CassandraCluster) -> Result<ObjectKey, ControllerError> {
    ObjectKey::from_meta(&cluster.metadata).ok_or_else(|| {
        ControllerError::InvalidConfig(
            "CassandraCluster event without name or namespace".to_string(),
        )
    })
}

/// Runs one reconcile and maps its outcome to the next requeue.
pub(crate) async fn reconcile(
    cluster: Arc<CassandraCluster>,
    ctx: Arc<WatchContext>,
) -> Result<Action, ControllerError> {
    let key = cluster_key(&cluster)?;
    let requeue = ctx.reconciler.handle_request(&key).await?;
    ctx.backoff.reset(&key);
    Ok(Action::requeue(requeue.unwrap_or(ctx.resync_interval)))
}

/// Requeues a failed cluster after its next Fibonacci delay.
pub(crate) fn error_policy(
    cluster: Arc<CassandraCluster>,
    error: &ControllerError,
    ctx: Arc<WatchContext>,
) -> Action {
    let delay = match cluster_key(&cluster) {
        Ok(key) => {
            let delay = ctx.backoff.next_for(&key);
            warn!(
                "Reconciliation error for CassandraCluster {}: {} (retrying in {:?})",
                key, error, delay
            );
            delay
        }
        Err(_) => {
            error!("Reconciliation error for unnamed CassandraCluster: {}", error);
            ctx.resync_interval
        }
    };
    Action::requeue(delay)
}

/// Watches CassandraClusters and their children until shutdown.
pub async fn watch_clusters(
    client: Client,
    namespace: Option<String>,
    ctx: Arc<WatchContext>,
) -> Result<(), ControllerError> {
    info!("Starting CassandraCluster watcher");

    let (clusters, services, stateful_sets): (
        Api<CassandraCluster>,
        Api<Service>,
        Api<StatefulSet>,
    ) = match namespace.as_deref() {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client, ns),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone()), Api::all(client)),
    };

    let managed = format!("{MANAGED_BY_LABEL}={MANAGED_BY_LABEL_VALUE}");
    let owned_config = watcher::Config::default().labels(&managed);

    // Debounce batches bursts of child events into one reconcile
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(clusters, watcher::Config::default())
        .owns(services, owned_config.clone())
        .owns(stateful_sets, owned_config)
        .with_config(controller_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((object, _)) => debug!("Reconciled CassandraCluster {}", object),
                Err(e) => error!("CassandraCluster controller error: {}", e),
            }
        })
        .await;

    info!("CassandraCluster watcher stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use cluster_store::{MockClusterStore, ResourceKind};

    fn context(store: &MockClusterStore) -> Arc<WatchContext> {
        Arc::new(WatchContext::new(
            Reconciler::new(store.clone(), TEST_TIMEOUT),
            Duration::from_secs(300),
        ))
    }

    #[tokio::test]
    async fn test_success_requeues_after_resync_interval() {
        let store = MockClusterStore::new();
        store.add_cluster(demo_cluster());
        let ctx = context(&store);

        let action = reconcile(Arc::new(demo_cluster()), ctx).await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn test_errors_back_off_and_reset_on_success() {
        let store = MockClusterStore::new();
        store.add_cluster(demo_cluster());
        store.hang_on_get(ResourceKind::Service, "demo-seed-service");
        let ctx = context(&store);
        let cluster = Arc::new(demo_cluster());

        let err = reconcile(cluster.clone(), ctx.clone()).await.unwrap_err();
        assert_eq!(
            error_policy(cluster.clone(), &err, ctx.clone()),
            Action::requeue(Duration::from_secs(5))
        );
        assert_eq!(
            error_policy(cluster.clone(), &err, ctx.clone()),
            Action::requeue(Duration::from_secs(5))
        );
        assert_eq!(
            error_policy(cluster.clone(), &err, ctx.clone()),
            Action::requeue(Duration::from_secs(10))
        );

        store.clear_failures();
        reconcile(cluster.clone(), ctx.clone()).await.unwrap();
        assert_eq!(error_policy(cluster, &err, ctx), Action::requeue(Duration::from_secs(5)));
    }
}
