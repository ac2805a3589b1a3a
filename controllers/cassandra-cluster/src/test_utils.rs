//! Test utilities for unit testing the reconciler
//!
//! Fixture clusters and a reconciler wired to a [`MockClusterStore`].

use crate::reconciler::{ReconcileContext, Reconciler};
use cluster_store::{ClusterStore, MockClusterStore, ObjectKey};
use crds::{CassandraCluster, CassandraClusterSpec, Datacenter, Rack};
use std::time::Duration;

/// Namespace every fixture lives in
pub const TEST_NAMESPACE: &str = "default";

/// Short get timeout so hang scenarios finish quickly
pub const TEST_TIMEOUT: Duration = Duration::from_millis(50);

/// Datacenter with the given racks
pub fn datacenter(name: &str, nodes_per_rack: i32, racks: &[&str]) -> Datacenter {
    Datacenter {
        name: name.to_string(),
        nodes_per_rack,
        racks: racks.iter().map(|r| Rack { name: r.to_string() }).collect(),
    }
}

/// CassandraCluster named `name` in the test namespace
pub fn create_test_cluster(name: &str, datacenters: Vec<Datacenter>) -> CassandraCluster {
    let mut cluster = CassandraCluster::new(
        name,
        CassandraClusterSpec {
            name: name.to_string(),
            datacenters,
            config: None,
        },
    );
    cluster.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    cluster
}

/// `demo` cluster: one datacenter `dc1` with one rack `rack1` of three nodes
pub fn demo_cluster() -> CassandraCluster {
    create_test_cluster("demo", vec![datacenter("dc1", 3, &["rack1"])])
}

/// Identity of `name` in the test namespace
pub fn key(name: &str) -> ObjectKey {
    ObjectKey::new(TEST_NAMESPACE, name)
}

/// Reconciler over `store`
pub fn reconciler(store: &MockClusterStore) -> Reconciler {
    Reconciler::new(store.clone(), TEST_TIMEOUT)
}

/// Store already holding `cluster` (with a uid assigned)
pub fn store_with(cluster: CassandraCluster) -> MockClusterStore {
    let store = MockClusterStore::new();
    store.add_cluster(cluster);
    store
}

/// Reconcile context for `cluster` as if it had been fetched from the API server
pub fn context_for(mut cluster: CassandraCluster) -> ReconcileContext {
    cluster.metadata.uid = Some(format!("uid-{}", cluster.spec.name));
    let key = key(cluster.metadata.name.as_deref().unwrap_or_default());
    ReconcileContext::new(cluster, &key)
}

/// Edits the stored cluster in place, keeping its uid
pub async fn update_cluster(
    store: &MockClusterStore,
    name: &str,
    edit: impl FnOnce(&mut CassandraCluster),
) {
    let mut cluster = store.get_cluster(&key(name)).await.unwrap();
    edit(&mut cluster);
    store.add_cluster(cluster);
}
