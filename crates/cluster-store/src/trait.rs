//! ClusterStore trait for mocking
//!
//! The reconciliation engine only talks to the API server through this
//! trait. [`crate::KubeClusterStore`] implements it over `kube::Api`, and the
//! `test-util` feature provides an in-memory implementation for unit tests.

use crate::error::StoreError;
use crate::key::ObjectKey;
use crds::CassandraCluster;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;

/// Read/write access to the objects a CassandraCluster reconciliation touches.
///
/// Writes follow API server semantics: `create_*` fails with
/// [`StoreError::AlreadyExists`] when the name is taken, and `replace_*`
/// fails with [`StoreError::Conflict`] when the object's `resourceVersion`
/// is stale.
#[async_trait::async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_cluster(&self, key: &ObjectKey) -> Result<CassandraCluster, StoreError>;

    // Services
    async fn get_service(&self, key: &ObjectKey) -> Result<Service, StoreError>;
    async fn create_service(&self, service: &Service) -> Result<Service, StoreError>;
    async fn replace_service(&self, service: &Service) -> Result<Service, StoreError>;

    // StatefulSets
    async fn get_stateful_set(&self, key: &ObjectKey) -> Result<StatefulSet, StoreError>;
    async fn create_stateful_set(
        &self,
        stateful_set: &StatefulSet,
    ) -> Result<StatefulSet, StoreError>;
    async fn replace_stateful_set(
        &self,
        stateful_set: &StatefulSet,
    ) -> Result<StatefulSet, StoreError>;
}
