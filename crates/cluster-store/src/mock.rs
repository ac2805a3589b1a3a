//! Mock ClusterStore for unit testing
//!
//! Stores objects in memory with the write semantics of the API server:
//! creates of an existing name fail with `AlreadyExists`, replaces carrying
//! a stale `resourceVersion` fail with `Conflict`, and every successful
//! write bumps the `resourceVersion`.
//!
//! Every write attempt is appended to a journal so tests can assert on the
//! order of writes and on their absence.

use crate::error::StoreError;
use crate::key::{ObjectKey, ResourceKind, key_of};
use crate::store_trait::ClusterStore;
use crds::CassandraCluster;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::Resource;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store operation a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// A read by key
    Get,
    /// A create of a new object
    Create,
    /// A replace at a resourceVersion
    Replace,
}

/// Failure returned by an injected fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Answer as if the object did not exist
    NotFound,
    /// Answer as if another writer created the object first
    AlreadyExists,
    /// Answer as if the resourceVersion were stale
    Conflict,
    /// Answer as if the API server were overloaded
    Unavailable,
}

impl MockFailure {
    fn into_error(self, kind: ResourceKind, name: &str) -> StoreError {
        let name = name.to_string();
        match self {
            Self::NotFound => StoreError::NotFound { kind, name },
            Self::AlreadyExists => StoreError::AlreadyExists { kind, name },
            Self::Conflict => StoreError::Conflict {
                kind,
                name,
                message: "injected conflict".to_string(),
            },
            Self::Unavailable => StoreError::Unavailable {
                kind,
                name,
                message: "injected failure".to_string(),
            },
        }
    }
}

/// One attempted write, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Create or Replace
    pub operation: MockOperation,
    /// Kind of the written object
    pub kind: ResourceKind,
    /// Name of the written object
    pub name: String,
}

#[derive(Default)]
struct MockState {
    clusters: HashMap<ObjectKey, CassandraCluster>,
    services: HashMap<ObjectKey, Service>,
    stateful_sets: HashMap<ObjectKey, StatefulSet>,
    writes: Vec<WriteRecord>,
    failures: HashMap<(MockOperation, ResourceKind, String), MockFailure>,
    hanging_gets: HashSet<(ResourceKind, String)>,
    next_version: u64,
}

impl MockState {
    fn next_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

trait MockObject: Resource + Clone {
    const KIND: ResourceKind;
    fn objects(state: &mut MockState) -> &mut HashMap<ObjectKey, Self>;
}

impl MockObject for CassandraCluster {
    const KIND: ResourceKind = ResourceKind::CassandraCluster;
    fn objects(state: &mut MockState) -> &mut HashMap<ObjectKey, Self> {
        &mut state.clusters
    }
}

impl MockObject for Service {
    const KIND: ResourceKind = ResourceKind::Service;
    fn objects(state: &mut MockState) -> &mut HashMap<ObjectKey, Self> {
        &mut state.services
    }
}

impl MockObject for StatefulSet {
    const KIND: ResourceKind = ResourceKind::StatefulSet;
    fn objects(state: &mut MockState) -> &mut HashMap<ObjectKey, Self> {
        &mut state.stateful_sets
    }
}

/// In-memory [`ClusterStore`]
#[derive(Clone, Default)]
pub struct MockClusterStore {
    state: Arc<Mutex<MockState>>,
}

impl MockClusterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a CassandraCluster (for test setup). A uid is assigned when missing
    /// so owner references can be built from it.
    pub fn add_cluster(&self, mut cluster: CassandraCluster) {
        let mut state = self.state();
        let version = state.next_version();
        if cluster.metadata.uid.is_none() {
            cluster.metadata.uid = Some(format!("uid-{version}"));
        }
        cluster.metadata.resource_version = Some(version);
        if let Some(key) = ObjectKey::from_meta(&cluster.metadata) {
            state.clusters.insert(key, cluster);
        }
    }

    /// Remove a CassandraCluster, as if it was deleted between trigger and fetch
    pub fn remove_cluster(&self, key: &ObjectKey) {
        self.state().clusters.remove(key);
    }

    /// Add a Service without recording a write (for test setup)
    pub fn add_service(&self, service: Service) {
        self.insert_untracked(service);
    }

    /// Add a StatefulSet without recording a write (for test setup)
    pub fn add_stateful_set(&self, stateful_set: StatefulSet) {
        self.insert_untracked(stateful_set);
    }

    fn insert_untracked<K: MockObject>(&self, mut object: K) {
        let mut state = self.state();
        let version = state.next_version();
        object.meta_mut().resource_version = Some(version);
        if let Some(key) = ObjectKey::from_meta(object.meta()) {
            K::objects(&mut state).insert(key, object);
        }
    }

    /// Current stored Service
    pub fn service(&self, key: &ObjectKey) -> Option<Service> {
        self.state().services.get(key).cloned()
    }

    /// Current stored StatefulSet
    pub fn stateful_set(&self, key: &ObjectKey) -> Option<StatefulSet> {
        self.state().stateful_sets.get(key).cloned()
    }

    /// Number of stored StatefulSets
    pub fn stateful_set_count(&self) -> usize {
        self.state().stateful_sets.len()
    }

    /// Every write attempted so far, in order
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state().writes.clone()
    }

    /// Forget the write journal
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Make an operation on the named object fail until cleared
    pub fn fail_on(
        &self,
        operation: MockOperation,
        kind: ResourceKind,
        name: &str,
        failure: MockFailure,
    ) {
        self.state().failures.insert((operation, kind, name.to_string()), failure);
    }

    /// Make gets of the named object never complete
    pub fn hang_on_get(&self, kind: ResourceKind, name: &str) {
        self.state().hanging_gets.insert((kind, name.to_string()));
    }

    /// Remove all injected failures and hangs
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failures.clear();
        state.hanging_gets.clear();
    }

    async fn get<K: MockObject>(&self, key: &ObjectKey) -> Result<K, StoreError> {
        let (hang, failure) = {
            let state = self.state();
            (
                state.hanging_gets.contains(&(K::KIND, key.name.clone())),
                state.failures.get(&(MockOperation::Get, K::KIND, key.name.clone())).copied(),
            )
        };
        if hang {
            futures::future::pending::<()>().await;
        }
        if let Some(failure) = failure {
            return Err(failure.into_error(K::KIND, &key.name));
        }
        K::objects(&mut self.state())
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: K::KIND,
                name: key.name.clone(),
            })
    }

    fn write<K: MockObject>(&self, operation: MockOperation, object: &K) -> Result<K, StoreError> {
        let key = key_of(K::KIND, object)?;
        let mut state = self.state();
        state.writes.push(WriteRecord {
            operation,
            kind: K::KIND,
            name: key.name.clone(),
        });
        let injected = state.failures.get(&(operation, K::KIND, key.name.clone())).copied();
        if let Some(failure) = injected {
            return Err(failure.into_error(K::KIND, &key.name));
        }

        let stored_version = K::objects(&mut state)
            .get(&key)
            .map(|existing| existing.meta().resource_version.clone());
        match (operation, stored_version) {
            (MockOperation::Create, Some(_)) => {
                return Err(StoreError::AlreadyExists {
                    kind: K::KIND,
                    name: key.name,
                });
            }
            (MockOperation::Replace, None) => {
                return Err(StoreError::NotFound {
                    kind: K::KIND,
                    name: key.name,
                });
            }
            (MockOperation::Replace, Some(version))
                if version != object.meta().resource_version =>
            {
                return Err(StoreError::Conflict {
                    kind: K::KIND,
                    name: key.name,
                    message: "the object has been modified".to_string(),
                });
            }
            _ => {}
        }

        let version = state.next_version();
        let mut stored = object.clone();
        if stored.meta().uid.is_none() {
            stored.meta_mut().uid = Some(format!("uid-{version}"));
        }
        stored.meta_mut().resource_version = Some(version);
        K::objects(&mut state).insert(key, stored.clone());
        Ok(stored)
    }
}

#[async_trait::async_trait]
impl ClusterStore for MockClusterStore {
    async fn get_cluster(&self, key: &ObjectKey) -> Result<CassandraCluster, StoreError> {
        self.get(key).await
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Service, StoreError> {
        self.get(key).await
    }

    async fn create_service(&self, service: &Service) -> Result<Service, StoreError> {
        self.write(MockOperation::Create, service)
    }

    async fn replace_service(&self, service: &Service) -> Result<Service, StoreError> {
        self.write(MockOperation::Replace, service)
    }

    async fn get_stateful_set(&self, key: &ObjectKey) -> Result<StatefulSet, StoreError> {
        self.get(key).await
    }

    async fn create_stateful_set(
        &self,
        stateful_set: &StatefulSet,
    ) -> Result<StatefulSet, StoreError> {
        self.write(MockOperation::Create, stateful_set)
    }

    async fn replace_stateful_set(
        &self,
        stateful_set: &StatefulSet,
    ) -> Result<StatefulSet, StoreError> {
        self.write(MockOperation::Replace, stateful_set)
    }
}
