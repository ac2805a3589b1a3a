//! Kubernetes-backed ClusterStore

use crate::error::StoreError;
use crate::key::{ObjectKey, ResourceKind, key_of};
use crate::store_trait::ClusterStore;
use crds::CassandraCluster;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// [`ClusterStore`] over the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    /// Creates a store sharing the given client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get<K>(&self, kind: ResourceKind, key: &ObjectKey) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        debug!("GET {} {}", kind, key);
        self.api::<K>(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| StoreError::from_kube(e, kind, &key.name))
    }

    async fn create<K>(&self, kind: ResourceKind, object: &K) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let key = key_of(kind, object)?;
        debug!("POST {} {}", kind, key);
        self.api::<K>(&key.namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| StoreError::from_kube(e, kind, &key.name))
    }

    async fn replace<K>(&self, kind: ResourceKind, object: &K) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let key = key_of(kind, object)?;
        debug!("PUT {} {}", kind, key);
        self.api::<K>(&key.namespace)
            .replace(&key.name, &PostParams::default(), object)
            .await
            .map_err(|e| StoreError::from_kube(e, kind, &key.name))
    }
}

#[async_trait::async_trait]
impl ClusterStore for KubeClusterStore {
    async fn get_cluster(&self, key: &ObjectKey) -> Result<CassandraCluster, StoreError> {
        self.get(ResourceKind::CassandraCluster, key).await
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Service, StoreError> {
        self.get(ResourceKind::Service, key).await
    }

    async fn create_service(&self, service: &Service) -> Result<Service, StoreError> {
        self.create(ResourceKind::Service, service).await
    }

    async fn replace_service(&self, service: &Service) -> Result<Service, StoreError> {
        self.replace(ResourceKind::Service, service).await
    }

    async fn get_stateful_set(&self, key: &ObjectKey) -> Result<StatefulSet, StoreError> {
        self.get(ResourceKind::StatefulSet, key).await
    }

    async fn create_stateful_set(
        &self,
        stateful_set: &StatefulSet,
    ) -> Result<StatefulSet, StoreError> {
        self.create(ResourceKind::StatefulSet, stateful_set).await
    }

    async fn replace_stateful_set(
        &self,
        stateful_set: &StatefulSet,
    ) -> Result<StatefulSet, StoreError> {
        self.replace(ResourceKind::StatefulSet, stateful_set).await
    }
}
